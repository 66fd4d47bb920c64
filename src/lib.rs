//! Squash debug-attachment reverse proxy.
//!
//! A reverse proxy whose request path can pause an inbound request, ask an
//! external squash control plane to provision a debug attachment, poll the
//! attachment until a debugger reports itself attached (or errors out, or a
//! deadline passes), and then resume forwarding the request unmodified.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌────────────────────────────────────────────────────┐
//!                │                     PROXY                          │
//!                │                                                    │
//!  Client ───────┼─▶ http/server ──▶ middleware/squash ──▶ forward ───┼──▶ Upstream
//!                │                        │                           │
//!                │                        ▼ (trigger header only)     │
//!                │                  squash/filter                     │
//!                │                  create ──▶ poll ──▶ resume        │
//!                │                        │                           │
//!                │                        ▼                           │
//!                │                  squash/client ────────────────────┼──▶ Squash
//!                │                  (upstream cluster registry)       │    control plane
//!                │                                                    │
//!                │   config · observability · lifecycle               │
//!                └────────────────────────────────────────────────────┘
//! ```
//!
//! The filter is strictly fail-open: every failure mode (transport error,
//! refused creation, malformed reply, deadline) ends with the original
//! request being forwarded normally. The only client-visible effect is
//! added latency, bounded by the configured attachment deadline.

// Core subsystems
pub mod config;
pub mod http;
pub mod squash;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
