//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pothole_core::PotholeError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Core error - storage, detection or notification failure
    #[error("{0}")]
    Core(#[from] PotholeError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(ref e) => match e {
                PotholeError::NotFound(_) => StatusCode::NOT_FOUND,

                // Storage, model and alert failures are all server-side
                PotholeError::MalformedRecord(_)
                | PotholeError::StorageRead(_)
                | PotholeError::StorageWrite(_)
                | PotholeError::DetectionFailure(_)
                | PotholeError::NotificationFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Core(ref e) => match e {
                PotholeError::NotFound(_) => "POTHOLE_NOT_FOUND",
                PotholeError::MalformedRecord(_) => "MALFORMED_RECORD",
                PotholeError::StorageRead(_) | PotholeError::StorageWrite(_) => "STORAGE_ERROR",
                PotholeError::DetectionFailure(_) => "DETECTION_FAILED",
                PotholeError::NotificationFailure(_) => "NOTIFICATION_FAILED",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Storage errors carry file paths; keep them in the logs only
            Self::Core(ref e) => match e {
                PotholeError::NotFound(_) => e.to_string(),
                PotholeError::MalformedRecord(_) => "Stored record is malformed".to_string(),
                PotholeError::StorageRead(_) => "Failed to read potholes".to_string(),
                PotholeError::StorageWrite(_) => "Failed to save potholes".to_string(),
                PotholeError::DetectionFailure(_) => "Detection failed".to_string(),
                PotholeError::NotificationFailure(_) => "Notification failed".to_string(),
            },
            Self::BadRequest(_) => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Core(PotholeError::NotFound(_)) => "not_found",
            Self::Core(PotholeError::DetectionFailure(_)) => "detection",
            Self::Core(PotholeError::NotificationFailure(_)) => "notification",
            Self::Core(_) => "storage",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_client_error() {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        } else {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_not_found_maps_to_404() {
        let err = ApiError::from(PotholeError::NotFound(42));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "POTHOLE_NOT_FOUND");
        assert_eq!(err.client_message(), "Pothole #42 not found");
    }

    #[test]
    fn test_storage_errors_are_sanitized() {
        let err = ApiError::from(PotholeError::StorageWrite(
            "/var/data/potholes.csv: permission denied".into(),
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(!err.client_message().contains("/var/data"));
    }

    #[test]
    fn test_detection_failure_is_500() {
        let err = ApiError::from(PotholeError::DetectionFailure("model timed out".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "DETECTION_FAILED");
    }

    #[test]
    fn test_bad_request() {
        let err = ApiError::bad_request("missing file");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Bad request: missing file");
    }
}
