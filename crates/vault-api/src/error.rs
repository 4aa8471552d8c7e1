//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vault_core::VaultError;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unavailable { code: &'static str, message: String },
    Internal { code: &'static str, message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_REQUEST", "Invalid request").with_details(msg),
            ),
            AppError::Unavailable { code, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new(code, "Service temporarily unavailable").with_details(message),
            ),
            AppError::Internal { code, message } => {
                tracing::error!(code, error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new(code, "Internal server error"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        let message = err.to_string();

        match err {
            VaultError::ValidationError(_) | VaultError::PlaintextTooLarge { .. } => {
                AppError::BadRequest(message)
            }
            VaultError::BackendUnavailable(_) => AppError::Unavailable {
                code: "BACKEND_UNAVAILABLE",
                message,
            },
            VaultError::ModelUnavailable(_) => AppError::Unavailable {
                code: "MODEL_UNAVAILABLE",
                message,
            },
            VaultError::KeyUnavailable(_) => AppError::Unavailable {
                code: "KEY_UNAVAILABLE",
                message,
            },
            VaultError::KeyLoadError(_) => AppError::Internal {
                code: "KEY_LOAD_ERROR",
                message,
            },
            VaultError::DecryptionFailed(_) => AppError::Internal {
                code: "DECRYPTION_FAILED",
                message,
            },
            VaultError::ConfigError(_) => AppError::Internal {
                code: "CONFIG_ERROR",
                message,
            },
            VaultError::Other(_) => AppError::Internal {
                code: "INTERNAL_ERROR",
                message,
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
