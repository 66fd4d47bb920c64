//! HTTP server setup and forwarding.
//!
//! # Responsibilities
//! - Create the Axum router and middleware stack
//! - Hold the active runtime snapshot (upstreams + squash filter)
//! - Forward requests to the configured upstream cluster
//! - Apply config reloads by swapping the snapshot
//! - Drain cleanly on shutdown

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::uri::{Authority, Scheme},
    http::{Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ForwardConfig, ProxyConfig};
use crate::http::middleware::squash_middleware;
use crate::observability::metrics;
use crate::squash::{ClusterClient, SquashFilter, SquashSettings};
use crate::upstream::UpstreamSet;

/// Everything derived from one accepted configuration. Swapped wholesale on
/// reload so in-flight requests keep a consistent view.
pub struct Runtime {
    pub upstreams: Arc<UpstreamSet>,
    pub forward: ForwardConfig,
    pub squash: Arc<SquashFilter>,
}

impl Runtime {
    pub fn from_config(config: &ProxyConfig, client: &Client<HttpConnector, Body>) -> Self {
        let upstreams = Arc::new(UpstreamSet::from_config(&config.upstreams));
        let settings = SquashSettings::from_config(&config.squash);
        let attachment_client = Arc::new(ClusterClient::new(
            settings.cluster.clone(),
            upstreams.clone(),
            client.clone(),
            settings.request_timeout,
        ));
        let squash = Arc::new(SquashFilter::new(settings, attachment_client));

        Self {
            upstreams,
            forward: config.proxy.clone(),
            squash,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ArcSwap<Runtime>>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let runtime = Arc::new(ArcSwap::from_pointee(Runtime::from_config(&config, &client)));

        let state = AppState {
            runtime,
            client,
        };

        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(forward_handler))
            .route("/{*path}", any(forward_handler))
            .with_state(state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::from_fn_with_state(state, squash_middleware)),
            )
    }

    /// Run the server until shutdown, applying config reloads as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                tracing::info!("Applying reloaded configuration");
                let runtime = Runtime::from_config(&config, &reload_state.client);
                reload_state.runtime.store(Arc::new(runtime));
            }
        });

        let app = self.router.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward the (possibly squash-delayed) request to the configured upstream.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let runtime = state.runtime.load_full();

    let upstream = match runtime.upstreams.get(&runtime.forward.upstream) {
        Some(upstream) => upstream,
        None => {
            tracing::warn!(upstream = %runtime.forward.upstream, "Forward upstream not configured");
            metrics::record_proxy_request(&method, 503, "none", start);
            return (StatusCode::SERVICE_UNAVAILABLE, "No forward upstream configured")
                .into_response();
        }
    };
    let addr = match upstream.next_endpoint() {
        Some(addr) => addr,
        None => {
            tracing::warn!(upstream = %upstream.name, "Forward upstream has no endpoints");
            metrics::record_proxy_request(&method, 503, &upstream.name, start);
            return (StatusCode::SERVICE_UNAVAILABLE, "No upstream endpoints").into_response();
        }
    };

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    if let Ok(authority) = Authority::from_str(&addr.to_string()) {
        uri_parts.authority = Some(authority);
    }
    if let Ok(uri) = Uri::from_parts(uri_parts) {
        parts.uri = uri;
    }
    let outbound = Request::from_parts(parts, body);

    let timeout = Duration::from_secs(runtime.forward.request_timeout_secs);
    match tokio::time::timeout(timeout, state.client.request(outbound)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            metrics::record_proxy_request(&method, status.as_u16(), &upstream.name, start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(upstream = %upstream.name, error = %e, "Upstream request failed");
            metrics::record_proxy_request(&method, 502, &upstream.name, start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
        Err(_) => {
            tracing::error!(upstream = %upstream.name, "Upstream request timed out");
            metrics::record_proxy_request(&method, 504, &upstream.name, start);
            (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
        }
    }
}
