//! Named upstream clusters with round-robin endpoint selection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::UpstreamConfig;

/// A single named cluster of interchangeable endpoints.
#[derive(Debug)]
pub struct Upstream {
    pub name: String,
    endpoints: Vec<SocketAddr>,
    cursor: AtomicUsize,
}

impl Upstream {
    pub fn new(name: impl Into<String>, endpoints: Vec<SocketAddr>) -> Self {
        Self {
            name: name.into(),
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Pick the next endpoint, rotating through the list.
    pub fn next_endpoint(&self) -> Option<SocketAddr> {
        if self.endpoints.is_empty() {
            return None;
        }
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(self.endpoints[n % self.endpoints.len()])
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

/// All configured clusters, keyed by name.
#[derive(Debug, Default)]
pub struct UpstreamSet {
    clusters: HashMap<String, Arc<Upstream>>,
}

impl UpstreamSet {
    /// Build the registry from configuration. Endpoints that fail to parse
    /// were already rejected by config validation; any stragglers are logged
    /// and skipped rather than taking the proxy down.
    pub fn from_config(configs: &[UpstreamConfig]) -> Self {
        let mut clusters = HashMap::new();
        for cfg in configs {
            let mut endpoints = Vec::with_capacity(cfg.endpoints.len());
            for ep in &cfg.endpoints {
                match ep.parse::<SocketAddr>() {
                    Ok(addr) => endpoints.push(addr),
                    Err(_) => {
                        tracing::warn!(upstream = %cfg.name, endpoint = %ep, "Skipping unparsable endpoint address");
                    }
                }
            }
            clusters.insert(
                cfg.name.clone(),
                Arc::new(Upstream::new(cfg.name.clone(), endpoints)),
            );
        }
        Self { clusters }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Upstream>> {
        self.clusters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clusters.contains_key(name)
    }
}
