pub mod api;
pub mod device;
pub mod storage;

pub use api::ApiError;
pub use device::DeviceError;
pub use storage::StorageError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_id) = match self {
            ApiError::DeviceError(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    tracing::error!("{}", e);
                }
                (status, e.to_string(), None)
            }
            ApiError::StorageError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(error_id.to_string()),
                )
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        // Add error_id if available (for internal errors)
        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use buspro_api::{BusError, DeviceAddress};

    use super::*;

    #[test]
    fn test_device_error_status() {
        let failed = ApiError::from(DeviceError::CommandFailed {
            device: DeviceAddress::new(1, 20),
            source: BusError::Timeout { opcode: 0xE3E0 },
        });
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);

        let missing = ApiError::from(DeviceError::AccessoryNotFound);
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(DeviceError::OutOfRange {
            field: "hue",
            value: 400,
        });
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_message() {
        let error = DeviceError::CommandFailed {
            device: DeviceAddress::new(1, 20),
            source: BusError::Rejected { opcode: 0x0031 },
        };
        assert_eq!(
            error.to_string(),
            "Command to device 1.20 failed: Device rejected 0x0031"
        );
    }
}
