//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_errors_total` (counter): failures by kind
//! - `proxy_upstream_bytes_total` (counter): bytes read from upstreams, by route
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request. `route` is `default`, `override` or `none`;
/// the caller-supplied host never becomes a label.
pub fn record_request(method: &Method, status: u16, route: &'static str, start: Instant) {
    let method = method_label(method);
    counter!(
        "proxy_requests_total",
        "method" => method,
        "status" => status.to_string(),
        "route" => route
    )
    .increment(1);

    histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}

/// Standard methods by name, anything else folded into `OTHER`.
fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::CONNECT => "CONNECT",
        Method::TRACE => "TRACE",
        _ => "OTHER",
    }
}

/// Record a failed request by error kind.
pub fn record_error(kind: &'static str) {
    counter!("proxy_errors_total", "kind" => kind).increment(1);
}

/// Record bytes received from an upstream.
pub fn record_upstream_bytes(route: &'static str, bytes: usize) {
    counter!("proxy_upstream_bytes_total", "route" => route).increment(bytes as u64);
}
