//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Named upstream clusters.
    pub upstreams: Vec<UpstreamConfig>,

    /// Where ordinary traffic is forwarded.
    pub proxy: ForwardConfig,

    /// Debug-attachment filter settings.
    pub squash: SquashConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A named cluster of interchangeable endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Cluster name, referenced by `proxy.upstream` and `squash.cluster`.
    pub name: String,

    /// Endpoint addresses (e.g., "127.0.0.1:3000").
    pub endpoints: Vec<String>,
}

/// Forwarding target for ordinary traffic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Upstream cluster requests are forwarded to.
    pub upstream: String,

    /// Timeout for the forward leg in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            upstream: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Debug-attachment filter settings.
///
/// An empty `cluster` disables the filter entirely; requests pass through
/// untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SquashConfig {
    /// Control-plane cluster name. Empty disables squashing.
    pub cluster: String,

    /// Attachment descriptor template with `{{ VAR }}` environment
    /// placeholders. Empty selects the built-in pod/namespace template.
    pub attachment_template: String,

    /// Overall bound on time spent squashing one request, in milliseconds.
    pub attachment_timeout_ms: u64,

    /// Delay between consecutive attachment polls, in milliseconds.
    pub attachment_poll_every_ms: u64,

    /// Per-call timeout for control-plane requests, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for SquashConfig {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            attachment_template: String::new(),
            attachment_timeout_ms: 60_000,
            attachment_poll_every_ms: 1_000,
            request_timeout_ms: 1_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
