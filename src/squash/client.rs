//! Control-plane client adapter.
//!
//! # Responsibilities
//! - Send create/poll requests to the configured squash cluster
//! - Enforce the per-call timeout on every outbound request
//! - Surface transport failures as values, never panics
//!
//! # Design Decisions
//! - The filter talks to a trait object so tests can script responses
//! - Cancellation is dropping the returned future; the driver awaits each
//!   call before issuing the next, so at most one is ever in flight

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;
use tokio::time;

use crate::squash::wire;
use crate::upstream::UpstreamSet;

/// Control-plane replies are small JSON objects; anything beyond this is
/// treated as a transport failure.
const MAX_REPLY_BYTES: usize = 64 * 1024;

/// Why an outbound call did not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream cluster `{0}` is not configured")]
    UnknownCluster(String),

    #[error("upstream cluster `{0}` has no usable endpoints")]
    NoEndpoints(String),

    #[error("request to `{path}` timed out after {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("request to `{path}` failed: {reason}")]
    Send { path: String, reason: String },
}

/// Status line and collected body of a control-plane reply.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// The outbound-call seam of the attachment state machine.
#[async_trait]
pub trait AttachmentClient: Send + Sync {
    /// POST the rendered descriptor to the attachment collection.
    async fn create_attachment(&self, descriptor: &str) -> Result<WireResponse, TransportError>;

    /// GET the attachment resource at `path`.
    async fn get_attachment(&self, path: &str) -> Result<WireResponse, TransportError>;
}

/// HTTP client bound to one named upstream cluster.
pub struct ClusterClient {
    cluster: String,
    upstreams: Arc<UpstreamSet>,
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl ClusterClient {
    pub fn new(
        cluster: impl Into<String>,
        upstreams: Arc<UpstreamSet>,
        client: Client<HttpConnector, Body>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            upstreams,
            client,
            request_timeout,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<WireResponse, TransportError> {
        let upstream = self
            .upstreams
            .get(&self.cluster)
            .ok_or_else(|| TransportError::UnknownCluster(self.cluster.clone()))?;
        let addr = upstream
            .next_endpoint()
            .ok_or_else(|| TransportError::NoEndpoints(self.cluster.clone()))?;

        let mut builder = Request::builder()
            .method(method)
            .uri(format!("http://{}{}", addr, path))
            .header(header::HOST, wire::SERVER_AUTHORITY);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .map_err(|e| TransportError::Send {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let response = match time::timeout(self.request_timeout, self.client.request(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(TransportError::Send {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransportError::Timeout {
                    path: path.to_string(),
                    after: self.request_timeout,
                })
            }
        };

        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_REPLY_BYTES)
            .await
            .map_err(|e| TransportError::Send {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(WireResponse { status, body })
    }
}

#[async_trait]
impl AttachmentClient for ClusterClient {
    async fn create_attachment(&self, descriptor: &str) -> Result<WireResponse, TransportError> {
        self.send(
            Method::POST,
            wire::ATTACHMENTS_PATH,
            Some(descriptor.to_string()),
        )
        .await
    }

    async fn get_attachment(&self, path: &str) -> Result<WireResponse, TransportError> {
        self.send(Method::GET, path, None).await
    }
}
