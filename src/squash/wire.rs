//! Wire protocol shared with the squash control plane.
//!
//! Only the *responses* are modeled; the create request body is an opaque
//! pre-rendered descriptor (see `descriptor`).

use axum::http::StatusCode;
use serde::Deserialize;

/// Request header whose presence marks a request for squashing.
pub const SQUASH_HEADER: &str = "x-squash-debug";

/// Collection path for debug attachment resources on the control plane.
pub const ATTACHMENTS_PATH: &str = "/api/v2/debugattachment";

/// Host header presented to the control-plane cluster.
pub const SERVER_AUTHORITY: &str = "squash-server";

/// Status the control plane answers a successful create with.
pub const CREATED_STATUS: StatusCode = StatusCode::CREATED;

/// Terminal attachment states. Anything else means "not yet attached".
pub const STATE_ATTACHED: &str = "attached";
pub const STATE_ERROR: &str = "error";

#[derive(Debug, Default, Deserialize)]
struct CreateReply {
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PollReply {
    #[serde(default)]
    status: Status,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    state: String,
}

/// Extract the attachment identifier from a create response body.
/// Returns `None` on unparsable JSON or a missing/empty name.
pub fn created_name(body: &[u8]) -> Option<String> {
    let reply: CreateReply = serde_json::from_slice(body).ok()?;
    if reply.metadata.name.is_empty() {
        None
    } else {
        Some(reply.metadata.name)
    }
}

/// Extract `status.state` from a poll response body. An unparsable body
/// yields `None`, which callers treat as a non-terminal state.
pub fn attachment_state(body: &[u8]) -> Option<String> {
    let reply: PollReply = serde_json::from_slice(body).ok()?;
    if reply.status.state.is_empty() {
        None
    } else {
        Some(reply.status.state)
    }
}

/// Poll path for a freshly created attachment.
pub fn attachment_path(name: &str) -> String {
    format!("{}/{}", ATTACHMENTS_PATH, name)
}
