//! Built-in endpoints answered before route dispatch.
//!
//! - `/health` - liveness with uptime and version
//! - `/metrics` - Prometheus metrics export
//!
//! Functions return `EndpointResponse` instead of writing to the session, so
//! the caller owns all session I/O and the handlers stay testable.

use std::time::Instant;

use crate::metrics;

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// Response from a built-in endpoint.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl EndpointResponse {
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    /// Plain text in the Prometheus exposition format.
    pub fn prometheus(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; version=0.0.4",
            body,
        }
    }
}

/// Answer a built-in endpoint, or `None` when `path` is not one.
pub fn dispatch(path: &str, start_time: Instant) -> Option<EndpointResponse> {
    match path {
        HEALTH_PATH => Some(handle_health(start_time)),
        METRICS_PATH => Some(handle_metrics()),
        _ => None,
    }
}

pub fn handle_health(start_time: Instant) -> EndpointResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION")
    })
    .to_string();

    EndpointResponse::json(200, body)
}

pub fn handle_metrics() -> EndpointResponse {
    match metrics::export() {
        Ok(text) => EndpointResponse::prometheus(text),
        Err(e) => {
            tracing::error!(error = %e, "Failed to export metrics");
            let body = serde_json::json!({ "error": "metrics export failed" }).to_string();
            EndpointResponse::json(500, body)
        }
    }
}

/// 405 for anything other than GET and HEAD
pub fn method_not_allowed(method: &str) -> EndpointResponse {
    let body = serde_json::json!({
        "error": "Method not allowed",
        "method": method,
        "allowed": ["GET", "HEAD"]
    })
    .to_string();

    EndpointResponse::json(405, body)
}
