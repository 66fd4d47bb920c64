//! Upstream cluster registry.
//!
//! # Data Flow
//! ```text
//! config upstreams
//!     → cluster.rs (parse endpoints, build named clusters)
//!     → UpstreamSet (name → cluster lookup)
//!     → consumers: forward handler, squash attachment client
//! ```
//!
//! # Design Decisions
//! - Clusters are immutable once built; a config reload swaps the whole set
//! - Endpoint selection is plain round-robin; connection state lives entirely
//!   in the shared hyper client pool

pub mod cluster;

pub use cluster::{Upstream, UpstreamSet};
