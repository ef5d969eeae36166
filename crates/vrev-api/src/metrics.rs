//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vrev_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vrev_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vrev_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "vrev_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "vrev_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "vrev_ws_messages_sent_total";
    pub const WS_RESYNCS_TOTAL: &str = "vrev_ws_resyncs_total";

    // Uploads
    pub const UPLOADS_TOTAL: &str = "vrev_uploads_total";
    pub const UPLOAD_BYTES: &str = "vrev_upload_bytes";
}

/// Label for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record WebSocket connection.
pub fn record_ws_connection(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record WebSocket message sent.
pub fn record_ws_message_sent(endpoint: &str, message_type: &str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("type", message_type.to_string()),
    ];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Record a lagging subscriber being resynced with a snapshot.
pub fn record_ws_resync(skipped: u64) {
    counter!(names::WS_RESYNCS_TOTAL).increment(1);
    tracing::debug!(skipped, "Subscriber lagged; resyncing");
}

/// Record an upload attempt.
pub fn record_upload(accepted: bool, bytes: usize) {
    let labels = [("accepted", accepted.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
    if accepted {
        histogram!(names::UPLOAD_BYTES).record(bytes as f64);
    }
}

/// Metrics middleware for HTTP requests.
///
/// Requests are labelled by their matched route so unknown paths cannot
/// blow up label cardinality.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
