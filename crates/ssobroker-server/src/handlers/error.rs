//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use ssobroker_auth::ExchangeError;

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is malformed or misses required parameters.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request does not identify anything we can serve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The browser has no usable session and must sign in.
    #[error("Login required")]
    LoginRequired {
        /// Set when a previous sign-in attempt was rejected.
        failed: bool,
    },

    /// The RPC request signature is missing or wrong.
    #[error("Invalid request signature")]
    InvalidSignature,

    /// A flow of the exchange engine failed.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid_request", "message": message }),
            ),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": message }),
            ),
            Self::LoginRequired { failed: false } => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "login_required" }),
            ),
            Self::LoginRequired { failed: true } => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "login_required",
                    "message": "Invalid username or password",
                }),
            ),
            Self::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "invalid_signature" }),
            ),
            Self::Exchange(err) if err.is_expected() => (
                StatusCode::NOT_FOUND,
                json!({ "error": err.error_code() }),
            ),
            Self::Exchange(err) => {
                tracing::error!(error = %err, category = %err.category(), "Exchange failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "server_error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
