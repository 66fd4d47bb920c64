//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by method, status, upstream
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `squash_attachments_created_total` (counter): accepted create calls
//! - `squash_attachment_polls_total` (counter): poll calls issued
//! - `squash_outcomes_total` (counter): finished sequences by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %e, "Failed to install Prometheus exporter");
        return;
    }

    describe_counter!("proxy_requests_total", "Forwarded requests");
    describe_histogram!("proxy_request_duration_seconds", "End-to-end request latency");
    describe_counter!("squash_attachments_created_total", "Debug attachments created");
    describe_counter!("squash_attachment_polls_total", "Attachment poll calls issued");
    describe_counter!("squash_outcomes_total", "Finished squash sequences by outcome");

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_proxy_request(method: &str, status: u16, upstream: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream.to_string(),
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_attachment_created() {
    counter!("squash_attachments_created_total").increment(1);
}

pub fn record_attachment_poll() {
    counter!("squash_attachment_polls_total").increment(1);
}

pub fn record_squash_outcome(outcome: &'static str) {
    counter!("squash_outcomes_total", "outcome" => outcome).increment(1);
}
