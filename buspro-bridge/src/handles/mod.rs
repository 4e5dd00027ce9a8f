pub mod cover_handle;
pub mod light_handle;

pub use cover_handle::*;
pub use light_handle::*;
