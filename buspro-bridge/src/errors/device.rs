use axum::http::StatusCode;
use buspro_api::{BusError, DeviceAddress};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Accessory not found")]
    AccessoryNotFound,

    #[error("Command to device {device} failed: {source}")]
    CommandFailed {
        device: DeviceAddress,
        #[source]
        source: BusError,
    },

    #[error("RGB channels undefined for {name}, missing {channel} channel")]
    MissingChannel { name: String, channel: &'static str },

    #[error("Value {value} out of range for {field}")]
    OutOfRange { field: &'static str, value: i64 },
}

impl DeviceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceError::AccessoryNotFound => StatusCode::NOT_FOUND,
            DeviceError::CommandFailed { .. } => StatusCode::BAD_GATEWAY,
            DeviceError::MissingChannel { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DeviceError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        }
    }
}
