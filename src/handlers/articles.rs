//! Public article API handlers: submit, list, fetch.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::counter;

use crate::errors::ApiError;
use crate::AppState;

/// Build a JSON response with an optional Cache-Control header.
///
/// The shared CORS header is added by middleware, not here.
pub(crate) fn json_response(
    status: StatusCode,
    body: &serde_json::Value,
    cache_control: Option<&'static str>,
) -> Response {
    let mut response = (
        status,
        [("content-type", "application/json")],
        body.to_string(),
    )
        .into_response();
    if let Some(value) = cache_control {
        response
            .headers_mut()
            .insert("cache-control", axum::http::HeaderValue::from_static(value));
    }
    response
}

/// `POST /api/articles` -- submit an article for moderation.
///
/// The Content-Length header is used as a fast size rejection before the
/// body is even inspected; the store re-checks the actual payload size.
pub async fn submit_article(
    state: Arc<AppState>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let declared_len = headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let article = state.articles.submit(body, declared_len).await?;
    counter!(crate::metrics::SUBMISSIONS_TOTAL).increment(1);

    Ok(json_response(
        StatusCode::CREATED,
        &serde_json::json!({
            "success": true,
            "slug": article.slug,
            "status": "pending",
            "message": "Article submitted successfully and is pending review",
        }),
        None,
    ))
}

/// `GET /api/articles` -- list live article metadata, newest first.
pub async fn list_articles(state: Arc<AppState>) -> Result<Response, ApiError> {
    let entries = state.articles.list_live().await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::to_value(entries)
            .map_err(|e| ApiError::internal("Failed to list articles", e.into()))?,
        Some("public, max-age=300"),
    ))
}

/// `GET /api/articles/:slug` -- fetch a single live article.
pub async fn get_article(state: Arc<AppState>, slug: &str) -> Result<Response, ApiError> {
    let article = state.articles.get_live(slug).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::to_value(article)
            .map_err(|e| ApiError::internal("Failed to get article", e.into()))?,
        Some("public, max-age=3600"),
    ))
}
