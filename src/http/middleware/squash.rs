//! Squash interception middleware.
//!
//! Sits ahead of the forward handler. A request carrying the squash trigger
//! is held here until the attachment sequence finishes; everything else
//! passes straight through. Either way the request is forwarded exactly
//! once, and a client that disconnects mid-squash tears the whole future
//! down without forwarding at all.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn squash_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // The snapshot is pinned for the whole sequence so a config reload
    // mid-squash cannot change the deadline or cluster under us.
    let squash = state.runtime.load_full().squash.clone();

    if squash.should_squash(req.headers()) {
        let outcome = squash.squash().await;
        metrics::record_squash_outcome(outcome.as_str());
    }

    next.run(req).await
}
