//! HTTP error type.
//!
//! Handlers return `Result<T, ApiError>`; every variant renders as a JSON
//! body of the form `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The caller sent an incomplete or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A request rejected while it was being read, with the status axum chose.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// A failure whose message is safe to show the caller.
    #[error(transparent)]
    Failed(anyhow::Error),

    /// A failure reported to the caller only as `public`; details stay in the log.
    #[error("{public}")]
    Masked {
        public: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn masked(public: &'static str, source: anyhow::Error) -> Self {
        ApiError::Masked { public, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Rejected { status, message } => (status, message),
            ApiError::Failed(e) => {
                error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Masked { public, source } => {
                error!(error = ?source, "{}", public);
                (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
