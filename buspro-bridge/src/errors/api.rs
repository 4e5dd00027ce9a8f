use super::{DeviceError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}
