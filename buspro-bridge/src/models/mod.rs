pub mod accessory;
pub mod cover;
pub mod light;

pub use accessory::{AccessoryContext, AccessoryTable};
pub use cover::{CoverState, CurtainCodes, MotionState};
pub use light::{Channel, ChannelLevels, ChannelMap, ColorSnapshot, ColorState};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;
}
