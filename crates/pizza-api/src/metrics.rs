//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use pizza_models::MediaType;
use std::time::Instant;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "pizza_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "pizza_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "pizza_http_requests_in_flight";

    // Processing metrics
    pub const UPLOADS_PROCESSED_TOTAL: &str = "pizza_uploads_processed_total";
    pub const UPLOADS_REJECTED_TOTAL: &str = "pizza_uploads_rejected_total";
    pub const PIZZAS_COUNTED_TOTAL: &str = "pizza_pizzas_counted_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a processed upload and the pizzas it contained.
pub fn record_upload(media_type: MediaType, count: u32) {
    let labels = [("type", media_type.as_str().to_string())];
    counter!(names::UPLOADS_PROCESSED_TOTAL, &labels).increment(1);
    counter!(names::PIZZAS_COUNTED_TOTAL, &labels).increment(count as u64);
}

/// Record an upload refused before processing.
pub fn record_upload_rejected(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::UPLOADS_REJECTED_TOTAL, &labels).increment(1);
}

/// Collapse static file paths so each result file doesn't get its own series.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/static/") {
        "/static/:file".to_string()
    } else {
        path.to_string()
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
