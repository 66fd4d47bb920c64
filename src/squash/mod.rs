//! Debug-attachment ("squash") subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request headers
//!     → filter.rs (trigger check: cluster configured + squash header)
//!     → filter.rs (create attachment on control plane, POST descriptor)
//!         descriptor.rs rendered the POST body once, at config time
//!         client.rs carries every outbound call, one in flight at a time
//!     → filter.rs (poll attachment until attached/error, or deadline)
//!     → middleware resumes forwarding the original request, exactly once
//! ```
//!
//! # Design Decisions
//! - Strictly fail-open: the worst outcome for the client is added latency,
//!   bounded by the attachment deadline
//! - The control plane is reached through the shared upstream registry; this
//!   subsystem holds no connection state of its own

pub mod client;
pub mod descriptor;
pub mod filter;
pub mod wire;

pub use client::{AttachmentClient, ClusterClient, TransportError, WireResponse};
pub use filter::{SquashFilter, SquashOutcome, SquashSettings};
