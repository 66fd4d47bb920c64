//! Shared utilities for integration testing.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Start a simple mock upstream backend that returns a fixed response.
/// Returns the address it listens on.
pub async fn start_upstream(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Scripted behavior for the mock squash control plane.
pub struct ControlPlaneScript {
    /// Status answered to the create POST.
    pub create_status: u16,
    /// Body answered to the create POST.
    pub create_body: String,
    /// Poll bodies served in order; the last one repeats.
    pub poll_bodies: Vec<String>,
    /// Never answer the create POST at all.
    pub hang_create: bool,
}

impl Default for ControlPlaneScript {
    fn default() -> Self {
        Self {
            create_status: 201,
            create_body: r#"{"metadata":{"name":"dbg-test"}}"#.to_string(),
            poll_bodies: vec![r#"{"status":{"state":"attached"}}"#.to_string()],
            hang_create: false,
        }
    }
}

/// Handle to a running mock control plane.
pub struct ControlPlane {
    pub addr: SocketAddr,
    pub create_calls: Arc<AtomicUsize>,
    pub poll_calls: Arc<AtomicUsize>,
}

impl ControlPlane {
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct ControlPlaneState {
    script: Arc<ControlPlaneScript>,
    polls: Arc<Mutex<VecDeque<String>>>,
    create_calls: Arc<AtomicUsize>,
    poll_calls: Arc<AtomicUsize>,
}

async fn create_attachment(State(state): State<ControlPlaneState>) -> impl IntoResponse {
    state.create_calls.fetch_add(1, Ordering::SeqCst);
    if state.script.hang_create {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    (
        StatusCode::from_u16(state.script.create_status).unwrap(),
        state.script.create_body.clone(),
    )
}

async fn poll_attachment(
    State(state): State<ControlPlaneState>,
    Path(_name): Path<String>,
) -> impl IntoResponse {
    state.poll_calls.fetch_add(1, Ordering::SeqCst);
    let body = {
        let mut polls = state.polls.lock().unwrap();
        if polls.len() > 1 {
            polls.pop_front().unwrap()
        } else {
            polls.front().cloned().unwrap_or_default()
        }
    };
    (StatusCode::OK, body)
}

/// Start a mock squash control plane following `script`.
pub async fn start_control_plane(script: ControlPlaneScript) -> ControlPlane {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = ControlPlaneState {
        polls: Arc::new(Mutex::new(script.poll_bodies.iter().cloned().collect())),
        script: Arc::new(script),
        create_calls: Arc::new(AtomicUsize::new(0)),
        poll_calls: Arc::new(AtomicUsize::new(0)),
    };
    let handle = ControlPlane {
        addr,
        create_calls: state.create_calls.clone(),
        poll_calls: state.poll_calls.clone(),
    };

    let app = Router::new()
        .route("/api/v2/debugattachment", post(create_attachment))
        .route("/api/v2/debugattachment/{name}", get(poll_attachment))
        .with_state(state);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    handle
}
