//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vscore_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vscore_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vscore_http_requests_in_flight";

    pub const UPLOADS_INITIATED_TOTAL: &str = "vscore_uploads_initiated_total";
    pub const RUNS_STARTED_TOTAL: &str = "vscore_runs_started_total";
    pub const RAG_QUERIES_TOTAL: &str = "vscore_rag_queries_total";
    pub const RAG_DOCUMENTS_INDEXED_TOTAL: &str = "vscore_rag_documents_indexed_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "vscore_rate_limit_hits_total";
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

pub fn record_upload_initiated() {
    counter!(names::UPLOADS_INITIATED_TOTAL).increment(1);
}

pub fn record_run_started() {
    counter!(names::RUNS_STARTED_TOTAL).increment(1);
}

pub fn record_rag_query(result_count: usize) {
    counter!(names::RAG_QUERIES_TOTAL).increment(1);
    histogram!("vscore_rag_results").record(result_count as f64);
}

pub fn record_document_indexed() {
    counter!(names::RAG_DOCUMENTS_INDEXED_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Video routes that are not ids.
const STATIC_VIDEO_SEGMENTS: &[&str] = &["init-upload"];

struct PathPatterns {
    uuid: Regex,
    numeric: Regex,
    video: Regex,
}

fn path_patterns() -> Option<&'static PathPatterns> {
    static PATTERNS: OnceLock<Option<PathPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(PathPatterns {
                uuid: Regex::new(
                    r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                )
                .ok()?,
                numeric: Regex::new(r"/[0-9]+(/|$)").ok()?,
                video: Regex::new(r"/videos/([^/]+)").ok()?,
            })
        })
        .as_ref()
}

/// Replace ids in a path so label cardinality stays bounded.
pub fn sanitize_path(path: &str) -> String {
    let Some(patterns) = path_patterns() else {
        return path.to_string();
    };

    let path = patterns.uuid.replace_all(path, ":id");
    let path = patterns.numeric.replace_all(&path, "/:id$1");
    let path = patterns.video.replace_all(&path, |caps: &regex_lite::Captures| {
        if STATIC_VIDEO_SEGMENTS.contains(&&caps[1]) {
            caps[0].to_string()
        } else {
            "/videos/:id".to_string()
        }
    });
    path.into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
