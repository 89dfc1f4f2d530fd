//! API error types.
//!
//! Every variant maps to one entry of the error taxonomy: validation,
//! not-found, authorization, rate-limit, and internal. The enum
//! implements [`axum::response::IntoResponse`] so handlers can simply
//! return `Err(ApiError::NotFound { .. })` and get a JSON error body
//! with the shared CORS header.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Render a byte ceiling in the largest whole binary unit, so a limit
/// below 1 MiB is never reported as "0MB".
fn format_size_limit(max_bytes: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if *max_bytes >= MIB && max_bytes % MIB == 0 {
        format!("{}MB", max_bytes / MIB)
    } else if *max_bytes >= KIB && max_bytes % KIB == 0 {
        format!("{}KB", max_bytes / KIB)
    } else {
        format!("{} bytes", max_bytes)
    }
}

/// Errors surfaced by the article API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required article field was absent or empty.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// The submitted payload exceeds the configured size ceiling.
    #[error("Article too large. Maximum size is {}", format_size_limit(.max_bytes))]
    PayloadTooLarge { max_bytes: u64 },

    /// The request body was not parseable JSON.
    #[error("Invalid JSON body: {message}")]
    InvalidBody { message: String },

    /// No record exists at the expected key.
    #[error("{what} not found")]
    NotFound { what: &'static str },

    /// Missing or mismatched API key.
    #[error("Unauthorized - {message}")]
    Unauthorized { message: String },

    /// The client exhausted its sliding-window request budget.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after_secs: u64 },

    /// Catch-all for store failures, malformed stored JSON, and other
    /// unexpected conditions. Never retried; the caller must resubmit.
    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    /// Wrap an internal failure with a stable, human-readable context
    /// string (e.g. "Failed to submit article").
    pub fn internal(context: &'static str, source: anyhow::Error) -> Self {
        ApiError::Internal { context, source }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            // Internal errors carry a best-effort diagnostic detail string.
            ApiError::Internal { context, source } => serde_json::json!({
                "error": context,
                "details": source.to_string(),
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        let mut response = (
            status,
            [
                ("content-type", "application/json".to_string()),
                ("access-control-allow-origin", "*".to_string()),
            ],
            body.to_string(),
        )
            .into_response();

        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }

        response
    }
}

// -- Tests --------------------------------------------------------------------
