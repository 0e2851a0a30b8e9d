use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use vault_model::VaultError;

pub type AppResult<T> = Result<T, AppError>;

/// HTTP-facing error: every handler returns this instead of `VaultError`
/// directly, so the status code lives next to the message instead of being
/// re-derived at the response boundary (spec.md §7).
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

/// Maps the error-kind table in spec.md §7 onto HTTP status codes.
impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match &err {
            VaultError::VaultNotFound(_) => AppError::not_found(err.to_string()),
            VaultError::FileNotFound(_) => AppError::not_found(err.to_string()),
            VaultError::InvalidPath { .. } => AppError::bad_request(err.to_string()),
            VaultError::ConfigInvalid(_) => AppError::bad_request(err.to_string()),
            VaultError::Search(_) => AppError::service_unavailable(err.to_string()),
            VaultError::BusFull { .. } => AppError::service_unavailable(err.to_string()),
            VaultError::Timeout(_) => AppError::new(StatusCode::GATEWAY_TIMEOUT, err.to_string()),
            VaultError::Io { .. } | VaultError::Storage(_) | VaultError::WatcherBackend { .. } | VaultError::ClientWriteFailed(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_not_found_maps_to_404() {
        let err: AppError = VaultError::VaultNotFound(vault_model::VaultId::new("missing")).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn search_not_ready_maps_to_503() {
        let err: AppError = VaultError::Search("index not ready".into()).into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
