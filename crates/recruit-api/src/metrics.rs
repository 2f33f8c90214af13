//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
/// Returns a handle that renders the text exposition format.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "recruit_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "recruit_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "recruit_http_requests_in_flight";

    // Auth metrics
    pub const LOGINS_TOTAL: &str = "recruit_logins_total";
    pub const REGISTRATIONS_TOTAL: &str = "recruit_registrations_total";
    pub const TOKEN_REFRESHES_TOTAL: &str = "recruit_token_refreshes_total";
    pub const BLACKLIST_PURGED_TOTAL: &str = "recruit_blacklist_purged_total";
    pub const BLACKLIST_SIZE: &str = "recruit_blacklist_size";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "recruit_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a login attempt (`success`, `invalid`, `inactive`).
pub fn record_login(outcome: &'static str) {
    counter!(names::LOGINS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_registration() {
    counter!(names::REGISTRATIONS_TOTAL).increment(1);
}

/// Record a refresh attempt (`rotated`, `reused`, `expired`, `invalid`, `wrong_type`).
pub fn record_refresh(outcome: &'static str) {
    counter!(names::TOKEN_REFRESHES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_blacklist_purge(removed: usize, remaining: usize) {
    counter!(names::BLACKLIST_PURGED_TOTAL).increment(removed as u64);
    gauge!(names::BLACKLIST_SIZE).set(remaining as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(route: &str) {
    let labels = [("route", route.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Route template for labels, so path parameters don't explode cardinality.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = route_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &route, status, duration);

    response
}
