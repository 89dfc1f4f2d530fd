//! Prometheus metrics.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides a Tower-compatible middleware for
//! HTTP RED metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "articlestore_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "articlestore_http_request_duration_seconds";

/// Requests rejected by the rate limiter (counter).
pub const RATE_LIMITED_TOTAL: &str = "articlestore_rate_limited_total";

/// Article submissions accepted into the pending namespace (counter).
pub const SUBMISSIONS_TOTAL: &str = "articlestore_submissions_total";

/// Moderation decisions (counter). Labels: decision = approved|rejected.
pub const MODERATIONS_TOTAL: &str = "articlestore_moderations_total";

/// Best-effort index updates that failed (counter).
pub const INDEX_UPDATE_FAILURES_TOTAL: &str = "articlestore_index_update_failures_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to call
/// multiple times (e.g. in tests). Returns a reference to the global handle.
pub fn init_metrics() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    })
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by the rate limiter");
    describe_counter!(SUBMISSIONS_TOTAL, "Accepted article submissions");
    describe_counter!(MODERATIONS_TOTAL, "Moderation decisions by outcome");
    describe_counter!(
        INDEX_UPDATE_FAILURES_TOTAL,
        "Best-effort index updates that failed"
    );
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
/// Must be the outermost layer so it captures the full request lifecycle.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    // Do not instrument the metrics endpoint itself.
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Normalize an actual request path to a route template for metric labels.
///
/// This prevents high-cardinality labels from unique slugs.
fn normalize_path(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/articles" | "/api/admin/pending" => path.to_string(),
        _ if path.starts_with("/api/articles/") => "/api/articles/{slug}".to_string(),
        _ if path.starts_with("/api/admin/approve/") => "/api/admin/approve/{slug}".to_string(),
        _ if path.starts_with("/api/admin/reject/") => "/api/admin/reject/{slug}".to_string(),
        _ => "/{other}".to_string(),
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus recorder not initialized");
    let body = handle.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_fixed_routes() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/api/articles"), "/api/articles");
        assert_eq!(normalize_path("/api/admin/pending"), "/api/admin/pending");
    }

    #[test]
    fn test_normalize_path_slug_routes() {
        assert_eq!(
            normalize_path("/api/articles/my-first-post"),
            "/api/articles/{slug}"
        );
        assert_eq!(
            normalize_path("/api/admin/approve/my-first-post"),
            "/api/admin/approve/{slug}"
        );
        assert_eq!(
            normalize_path("/api/admin/reject/spam-post"),
            "/api/admin/reject/{slug}"
        );
    }

    #[test]
    fn test_normalize_path_unknown() {
        assert_eq!(normalize_path("/nope"), "/{other}");
        assert_eq!(normalize_path("/"), "/{other}");
    }
}
