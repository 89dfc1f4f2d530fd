//! Moderation handlers: pending queue, approve, reject.
//!
//! Authorization happens in middleware before these run; every handler
//! here can assume the caller presented a valid API key (or that no key
//! is configured).

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use metrics::counter;

use super::articles::json_response;
use crate::errors::ApiError;
use crate::AppState;

/// `GET /api/admin/pending` -- full pending records for review,
/// newest first.
pub async fn list_pending(state: Arc<AppState>) -> Result<Response, ApiError> {
    let articles = state.articles.list_pending().await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::to_value(articles)
            .map_err(|e| ApiError::internal("Failed to list pending articles", e.into()))?,
        Some("no-cache"),
    ))
}

/// `PUT /api/admin/approve/:slug` -- promote a pending article to live.
pub async fn approve_article(state: Arc<AppState>, slug: &str) -> Result<Response, ApiError> {
    state.articles.approve(slug).await?;
    counter!(crate::metrics::MODERATIONS_TOTAL, "decision" => "approved").increment(1);
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "success": true,
            "message": "Article approved successfully",
        }),
        None,
    ))
}

/// `DELETE /api/admin/reject/:slug` -- delete a pending article.
pub async fn reject_article(state: Arc<AppState>, slug: &str) -> Result<Response, ApiError> {
    state.articles.reject(slug).await?;
    counter!(crate::metrics::MODERATIONS_TOTAL, "decision" => "rejected").increment(1);
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "success": true,
            "message": "Article rejected and removed",
        }),
        None,
    ))
}
