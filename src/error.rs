//! Domain-specific error types for trustcard

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::clients::ModelError;

/// Main error type for the trustcard service.
///
/// The scorecard core never produces these; they come from configuration,
/// template loading and the HTTP surface.
#[derive(Error, Debug)]
pub enum TrustcardError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Template library error: {message}")]
    Templates { message: String },

    #[error("Live model error: {message}")]
    Model { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid upload: {message}")]
    Upload { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for TrustcardError {
    fn from(err: anyhow::Error) -> Self {
        TrustcardError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TrustcardError {
    fn from(err: serde_json::Error) -> Self {
        TrustcardError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TrustcardError {
    fn from(err: toml::de::Error) -> Self {
        TrustcardError::Templates {
            message: err.to_string(),
        }
    }
}

impl From<ModelError> for TrustcardError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Timeout { timeout_ms } => TrustcardError::Timeout {
                operation: "live model call".to_string(),
                timeout_ms,
            },
            other => TrustcardError::Model {
                message: other.to_string(),
            },
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for TrustcardError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        TrustcardError::Upload {
            message: err.body_text(),
        }
    }
}

impl TrustcardError {
    fn status_and_label(&self) -> (StatusCode, &'static str) {
        match self {
            TrustcardError::Config { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error")
            }
            TrustcardError::Templates { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Template library error")
            }
            TrustcardError::Model { .. } => (StatusCode::BAD_GATEWAY, "Live model error"),
            TrustcardError::Serialization { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error")
            }
            TrustcardError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "Operation timeout"),
            TrustcardError::Validation { .. } => (StatusCode::BAD_REQUEST, "Validation error"),
            TrustcardError::Upload { .. } => (StatusCode::BAD_REQUEST, "Invalid upload"),
            TrustcardError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        }
    }
}

/// Render as `{"error": {"code", "message"}}` with a matching status
impl IntoResponse for TrustcardError {
    fn into_response(self) -> Response {
        let (status, label) = self.status_and_label();
        if status.is_server_error() {
            tracing::error!("{label}: {self}");
        }
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "label": label,
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for trustcard operations
pub type Result<T> = std::result::Result<T, TrustcardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = TrustcardError::Validation {
            message: "prompt is empty".into(),
        };
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn model_timeout_becomes_timeout_error() {
        let err: TrustcardError = ModelError::Timeout { timeout_ms: 250 }.into();
        assert!(matches!(
            err,
            TrustcardError::Timeout {
                timeout_ms: 250,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Timeout error: live model call timed out after 250ms"
        );
    }
}
