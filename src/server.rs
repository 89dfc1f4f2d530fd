//! Axum router construction and route mapping.
//!
//! The [`app`] function wires every endpoint to its handler and returns
//! a ready-to-serve [`axum::Router`]. Gates run as layers in a fixed
//! order before any business logic: metrics (outermost), rate limiting,
//! CORS/common headers (which also answers OPTIONS preflight), then
//! authorization (innermost, closest to the handlers).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use metrics::counter;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::auth;
use crate::errors::{generate_request_id, ApiError};
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Build the axum [`Router`] with all API routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Infrastructure endpoints (not part of the article API).
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Public article routes.
        .route("/api/articles", post(handle_submit).get(handle_list))
        .route("/api/articles/:slug", get(handle_get))
        // Moderation routes.
        .route("/api/admin/pending", get(handle_list_pending))
        .route("/api/admin/approve/:slug", put(handle_approve))
        .route("/api/admin/reject/:slug", delete(handle_reject))
        // Anything else: plain-text 404.
        .fallback(handle_not_found)
        .with_state(state.clone())
        // The submit path enforces the configured article size ceiling
        // itself (header fast path plus authoritative payload check);
        // axum's built-in 2 MiB body limit would otherwise preempt any
        // larger configured ceiling.
        .layer(axum::extract::DefaultBodyLimit::disable())
        // Layer ordering: inner layers run last. auth_middleware is
        // innermost (after routing decisions but before handlers);
        // cors_middleware answers preflight and stamps every response;
        // rate limiting gates everything including preflight;
        // metrics_middleware is outermost to capture the full lifecycle.
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn_with_state(state, rate_limit_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

// -- Rate limit middleware ----------------------------------------------------

/// Paths that bypass rate limiting and authorization.
const GATE_SKIP_PATHS: &[&str] = &["/health", "/metrics"];

/// Resolve the client identifier used as the rate-limit key.
///
/// Prefers the edge-provided `CF-Connecting-IP`, falls back to
/// `X-Forwarded-For`, then a shared "unknown" bucket.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Sliding-window admission gate applied to every API request.
async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path();
    if GATE_SKIP_PATHS.contains(&path) {
        return Ok(next.run(req).await);
    }

    let key = client_key(req.headers());
    if !state.rate_limiter.allow(&key) {
        counter!(crate::metrics::RATE_LIMITED_TOTAL).increment(1);
        debug!(client = %key, "Rate limit exceeded");
        return Err(ApiError::RateLimited {
            retry_after_secs: state.rate_limiter.window().as_secs(),
        });
    }

    Ok(next.run(req).await)
}

// -- CORS / common headers middleware -----------------------------------------

/// Answer OPTIONS preflight directly with 204, and stamp every other
/// response with the permissive CORS header plus `x-request-id`, `Date`,
/// and `Server`.
async fn cors_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    if req.method() == axum::http::Method::OPTIONS {
        return (
            StatusCode::NO_CONTENT,
            [
                ("access-control-allow-origin", "*"),
                (
                    "access-control-allow-methods",
                    "POST, GET, PUT, DELETE, OPTIONS",
                ),
                ("access-control-allow-headers", "Content-Type, X-API-Key"),
                ("access-control-max-age", "86400"),
            ],
        )
            .into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static("*"),
    );
    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&generate_request_id()) {
            headers.insert("x-request-id", value);
        }
    }
    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    if let Ok(value) = HeaderValue::from_str(&date) {
        headers.insert("date", value);
    }
    headers.insert("server", HeaderValue::from_static("Articlestore"));

    response
}

// -- Auth middleware ----------------------------------------------------------

/// Whether a request must present the API key before dispatch.
///
/// Write submissions and everything under the admin prefix require it;
/// public reads never do.
fn requires_auth(method: &axum::http::Method, path: &str) -> bool {
    (method == axum::http::Method::POST && path == "/api/articles")
        || path.starts_with("/api/admin/")
}

/// API key gate. Runs after routing but before any handler, so no
/// business logic executes for an unauthorized request.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if !requires_auth(&method, &path) {
        return Ok(next.run(req).await);
    }

    let presented = req
        .headers()
        .get(auth::API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if !auth::authorize(presented, state.config.auth.api_key.as_deref()) {
        let message = if path.starts_with("/api/admin/") {
            "Admin access requires valid API key"
        } else {
            "Invalid or missing API key"
        };
        return Err(ApiError::Unauthorized {
            message: message.to_string(),
        });
    }

    Ok(next.run(req).await)
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    crate::handlers::articles::submit_article(state, &headers, &body).await
}

async fn handle_list(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    crate::handlers::articles::list_articles(state).await
}

async fn handle_get(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    crate::handlers::articles::get_article(state, &slug).await
}

async fn handle_list_pending(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    crate::handlers::admin::list_pending(state).await
}

async fn handle_approve(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    crate::handlers::admin::approve_article(state, &slug).await
}

async fn handle_reject(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    crate::handlers::admin::reject_article(state, &slug).await
}

async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::ArticleStore;
    use crate::config::Config;
    use crate::ratelimit::RateLimiter;
    use crate::storage::memory::MemoryStore;
    use axum::body::Body;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn test_app(api_key: Option<&str>, max_requests: usize) -> Router {
        let mut config = Config::default();
        config.auth.api_key = api_key.map(|k| k.to_string());
        let state = Arc::new(AppState {
            articles: ArticleStore::new(
                Arc::new(MemoryStore::new()),
                config.limits.max_article_size,
            ),
            rate_limiter: RateLimiter::new(Duration::from_secs(60), max_requests),
            config,
        });
        app(state)
    }

    fn test_app_sized(max_article_size: u64) -> Router {
        let mut config = Config::default();
        config.limits.max_article_size = max_article_size;
        let state = Arc::new(AppState {
            articles: ArticleStore::new(Arc::new(MemoryStore::new()), max_article_size),
            rate_limiter: RateLimiter::new(Duration::from_secs(60), 1000),
            config,
        });
        app(state)
    }

    fn article_body(title: &str, date: &str) -> String {
        serde_json::json!({
            "title": title,
            "subtitle": "Sub",
            "content": "Body",
            "author": "Jane",
            "category": "eng",
            "date": date,
        })
        .to_string()
    }

    fn request(method: &str, uri: &str, api_key: Option<&str>, body: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(None, 100);
        let response = app
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_returns_201_with_slug() {
        let app = test_app(None, 100);
        let response = app
            .oneshot(request(
                "POST",
                "/api/articles",
                None,
                Some(article_body("My First Post", "2026-01-01")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["slug"], "my-first-post");
        assert_eq!(json["status"], "pending");
    }

    #[tokio::test]
    async fn test_submit_missing_field_is_400() {
        let app = test_app(None, 100);
        let body = serde_json::json!({
            "title": "T", "subtitle": "S", "content": "C",
            "author": "A", "category": "X",
        })
        .to_string();
        let response = app
            .oneshot(request("POST", "/api/articles", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Missing required field: date");
    }

    #[tokio::test]
    async fn test_submit_requires_key_when_configured() {
        let app = test_app(Some("s3cret"), 100);
        let response = app
            .oneshot(request(
                "POST",
                "/api/articles",
                None,
                Some(article_body("Post", "2026-01-01")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_submit_with_wrong_key_is_401() {
        let app = test_app(Some("s3cret"), 100);
        let response = app
            .oneshot(request(
                "POST",
                "/api/articles",
                Some("wrong"),
                Some(article_body("Post", "2026-01-01")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_requires_key_before_business_logic() {
        let app = test_app(Some("s3cret"), 100);
        for (method, uri) in [
            ("GET", "/api/admin/pending"),
            ("PUT", "/api/admin/approve/x"),
            ("DELETE", "/api/admin/reject/x"),
        ] {
            let response = app
                .clone()
                .oneshot(request(method, uri, None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_public_reads_never_need_key() {
        let app = test_app(Some("s3cret"), 100);
        let response = app
            .clone()
            .oneshot(request("GET", "/api/articles", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_full_moderation_flow() {
        let app = test_app(Some("s3cret"), 1000);

        // Submit.
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/articles",
                Some("s3cret"),
                Some(article_body("Flow Post", "2026-01-01")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Not yet public.
        let response = app
            .clone()
            .oneshot(request("GET", "/api/articles/flow-post", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Visible in the moderation queue.
        let response = app
            .clone()
            .oneshot(request("GET", "/api/admin/pending", Some("s3cret"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        // Admin queue returns full records, content included.
        assert_eq!(json[0]["content"], "Body");

        // Approve.
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                "/api/admin/approve/flow-post",
                Some("s3cret"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Now public, with approval stamp.
        let response = app
            .clone()
            .oneshot(request("GET", "/api/articles/flow-post", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "live");
        assert!(json.get("approvedAt").is_some());

        // Queue is empty; listing shows metadata without content.
        let response = app
            .clone()
            .oneshot(request("GET", "/api/admin/pending", Some("s3cret"), None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json.as_array().unwrap().is_empty());

        let response = app
            .oneshot(request("GET", "/api/articles", None, None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert!(json[0].get("content").is_none());
    }

    #[tokio::test]
    async fn test_reject_then_approve_is_404() {
        let app = test_app(None, 1000);
        app.clone()
            .oneshot(request(
                "POST",
                "/api/articles",
                None,
                Some(article_body("Doomed", "2026-01-01")),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(request("DELETE", "/api/admin/reject/doomed", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("PUT", "/api/admin/approve/doomed", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_size_ceiling_above_framework_default_is_honored() {
        // An 8 MiB ceiling must admit a 3 MiB article end to end.
        let app = test_app_sized(8 * 1024 * 1024);
        let body = serde_json::json!({
            "title": "Big Post",
            "subtitle": "Sub",
            "content": "x".repeat(3 * 1024 * 1024),
            "author": "Jane",
            "category": "eng",
            "date": "2026-01-01",
        })
        .to_string();
        let response = app
            .oneshot(request("POST", "/api/articles", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_oversize_submission_is_json_413() {
        let app = test_app_sized(1024);
        let body = serde_json::json!({
            "title": "Too Big",
            "subtitle": "Sub",
            "content": "x".repeat(4096),
            "author": "Jane",
            "category": "eng",
            "date": "2026-01-01",
        })
        .to_string();
        let response = app
            .oneshot(request("POST", "/api/articles", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Article too large. Maximum size is 1KB");
    }

    #[tokio::test]
    async fn test_options_preflight_is_204() {
        let app = test_app(Some("s3cret"), 100);
        let response = app
            .oneshot(request("OPTIONS", "/api/articles", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-headers")
                .unwrap(),
            "Content-Type, X-API-Key"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_plain_404() {
        let app = test_app(None, 100);
        let response = app
            .oneshot(request("GET", "/api/nope", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limit_yields_429_with_retry_after() {
        let app = test_app(None, 2);
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request("GET", "/api/articles", None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .oneshot(request("GET", "/api/articles", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("retry-after").unwrap(), "60");
    }

    #[tokio::test]
    async fn test_rate_limit_keys_on_forwarded_ip() {
        let app = test_app(None, 1);
        let first = Request::builder()
            .method("GET")
            .uri("/api/articles")
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let second = Request::builder()
            .method("GET")
            .uri("/api/articles")
            .header("x-forwarded-for", "10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            app.clone().oneshot(first).await.unwrap().status(),
            StatusCode::OK
        );
        // A different client is not affected by the first client's budget.
        assert_eq!(app.oneshot(second).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_responses_carry_cors_header() {
        let app = test_app(None, 100);
        let response = app
            .oneshot(request("GET", "/api/articles", None, None))
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[test]
    fn test_requires_auth_table() {
        use axum::http::Method;
        assert!(requires_auth(&Method::POST, "/api/articles"));
        assert!(requires_auth(&Method::GET, "/api/admin/pending"));
        assert!(requires_auth(&Method::PUT, "/api/admin/approve/x"));
        assert!(requires_auth(&Method::DELETE, "/api/admin/reject/x"));
        assert!(!requires_auth(&Method::GET, "/api/articles"));
        assert!(!requires_auth(&Method::GET, "/api/articles/some-slug"));
        assert!(!requires_auth(&Method::GET, "/health"));
    }
}
