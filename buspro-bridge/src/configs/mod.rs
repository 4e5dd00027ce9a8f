pub mod schema;
pub mod settings;
pub mod storage;

pub use schema::SchemaManager;
pub use settings::{Database, DeviceConfig, Gateway, Settings};
pub use storage::{AccessoryStore, MemoryStore, Storage};
