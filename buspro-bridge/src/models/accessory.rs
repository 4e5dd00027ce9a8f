use serde::{Deserialize, Serialize};

use crate::models::Table;
use crate::models::light::ColorSnapshot;

/// State an accessory keeps across restarts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_position: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_color: Option<ColorSnapshot>,
}

pub struct AccessoryTable;

impl Table for AccessoryTable {
    fn name(&self) -> &'static str {
        "accessories"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS accessories (
                id TEXT PRIMARY KEY NOT NULL,
                context TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS accessories;")
    }
}
