//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (squash/forward clusters must exist)
//! - Validate value ranges (durations > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the parsed config
//! - Runs before a config is accepted, at startup and on reload

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener bind address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("duplicate upstream name `{0}`")]
    DuplicateUpstream(String),

    #[error("upstream `{0}` has no endpoints")]
    EmptyUpstream(String),

    #[error("upstream `{name}` endpoint `{endpoint}` is not a valid socket address")]
    InvalidEndpoint { name: String, endpoint: String },

    #[error("proxy upstream `{0}` is not a configured upstream")]
    UnknownForwardUpstream(String),

    #[error("squash cluster `{0}` is not a configured upstream")]
    UnknownSquashCluster(String),

    #[error("`{0}` must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Validate a parsed configuration. Collects every violation so operators
/// can fix a config in one pass.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mut names = HashSet::new();
    for upstream in &config.upstreams {
        if !names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
        if upstream.endpoints.is_empty() {
            errors.push(ValidationError::EmptyUpstream(upstream.name.clone()));
        }
        for endpoint in &upstream.endpoints {
            if endpoint.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidEndpoint {
                    name: upstream.name.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
    }

    if !config.proxy.upstream.is_empty() && !names.contains(config.proxy.upstream.as_str()) {
        errors.push(ValidationError::UnknownForwardUpstream(
            config.proxy.upstream.clone(),
        ));
    }

    // An empty squash cluster is a valid way to disable the filter; a set
    // one must resolve, or the filter would fail every request it pauses.
    if !config.squash.cluster.is_empty() && !names.contains(config.squash.cluster.as_str()) {
        errors.push(ValidationError::UnknownSquashCluster(
            config.squash.cluster.clone(),
        ));
    }

    for (value, field) in [
        (config.squash.attachment_timeout_ms, "squash.attachment_timeout_ms"),
        (config.squash.attachment_poll_every_ms, "squash.attachment_poll_every_ms"),
        (config.squash.request_timeout_ms, "squash.request_timeout_ms"),
        (config.proxy.request_timeout_secs, "proxy.request_timeout_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
