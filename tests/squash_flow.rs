//! End-to-end squash flow tests against a mock control plane.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use squash_proxy::config::{ProxyConfig, UpstreamConfig};
use squash_proxy::http::HttpServer;
use squash_proxy::lifecycle::Shutdown;

mod common;

const SQUASH_HEADER: &str = "x-squash-debug";

fn attaching() -> String {
    r#"{"status":{"state":"attaching"}}"#.to_string()
}

fn attached() -> String {
    r#"{"status":{"state":"attached"}}"#.to_string()
}

fn base_config(upstream: SocketAddr, control_plane: Option<SocketAddr>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstreams.push(UpstreamConfig {
        name: "web".into(),
        endpoints: vec![upstream.to_string()],
    });
    config.proxy.upstream = "web".into();

    if let Some(addr) = control_plane {
        config.upstreams.push(UpstreamConfig {
            name: "squash".into(),
            endpoints: vec![addr.to_string()],
        });
        config.squash.cluster = "squash".into();
        config.squash.attachment_poll_every_ms = 100;
        config.squash.attachment_timeout_ms = 5_000;
        config.squash.request_timeout_ms = 1_000;
    }

    config
}

/// Spawn the proxy; the returned guards must stay alive for the duration of
/// the test or the server shuts down early.
async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown, mpsc::UnboundedSender<ProxyConfig>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown, updates_tx)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn request_without_trigger_passes_straight_through() {
    let upstream = common::start_upstream("hello").await;
    let control = common::start_control_plane(common::ControlPlaneScript::default()).await;
    let (proxy, shutdown, _updates) = start_proxy(base_config(upstream, Some(control.addr))).await;

    let res = client()
        .get(format!("http://{}/anything", proxy))
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello");
    assert_eq!(control.create_calls(), 0, "no trigger, no control-plane call");
    assert_eq!(control.poll_calls(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn disabled_filter_ignores_the_trigger_header() {
    let upstream = common::start_upstream("hello").await;
    let control = common::start_control_plane(common::ControlPlaneScript::default()).await;
    // Control plane is running but not configured as the squash cluster.
    let (proxy, shutdown, _updates) = start_proxy(base_config(upstream, None)).await;

    let res = client()
        .get(format!("http://{}/", proxy))
        .header(SQUASH_HEADER, "true")
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(control.create_calls(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn squashed_request_waits_for_attachment_then_forwards() {
    let upstream = common::start_upstream("debugged").await;
    let control = common::start_control_plane(common::ControlPlaneScript {
        poll_bodies: vec![attaching(), attached()],
        ..Default::default()
    })
    .await;
    let (proxy, shutdown, _updates) = start_proxy(base_config(upstream, Some(control.addr))).await;

    let start = Instant::now();
    let res = client()
        .get(format!("http://{}/", proxy))
        .header(SQUASH_HEADER, "true")
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "debugged");
    assert_eq!(control.create_calls(), 1);
    assert_eq!(control.poll_calls(), 2, "one not-yet poll, one terminal poll");
    // The second poll happens one poll interval after the first.
    assert!(start.elapsed() >= Duration::from_millis(100));

    shutdown.trigger();
}

#[tokio::test]
async fn refused_creation_forwards_immediately_without_polling() {
    let upstream = common::start_upstream("ok").await;
    let control = common::start_control_plane(common::ControlPlaneScript {
        create_status: 500,
        create_body: "oops".into(),
        ..Default::default()
    })
    .await;
    let (proxy, shutdown, _updates) = start_proxy(base_config(upstream, Some(control.addr))).await;

    let start = Instant::now();
    let res = client()
        .get(format!("http://{}/", proxy))
        .header(SQUASH_HEADER, "true")
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(control.create_calls(), 1);
    assert_eq!(control.poll_calls(), 0);
    // Well under the 5s attachment deadline: the failure finished the
    // sequence inline.
    assert!(start.elapsed() < Duration::from_secs(2));

    shutdown.trigger();
}

#[tokio::test]
async fn unresponsive_control_plane_is_bounded_by_the_deadline() {
    let upstream = common::start_upstream("ok").await;
    let control = common::start_control_plane(common::ControlPlaneScript {
        hang_create: true,
        ..Default::default()
    })
    .await;

    let mut config = base_config(upstream, Some(control.addr));
    config.squash.attachment_timeout_ms = 500;
    // Per-call timeout beyond the deadline so the deadline is what fires.
    config.squash.request_timeout_ms = 10_000;
    let (proxy, shutdown, _updates) = start_proxy(config).await;

    let start = Instant::now();
    let res = client()
        .get(format!("http://{}/", proxy))
        .header(SQUASH_HEADER, "true")
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200, "request resumes despite the hung control plane");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(500), "resumed before the deadline: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "deadline did not bound the pause: {elapsed:?}");
    assert_eq!(control.create_calls(), 1);
    assert_eq!(control.poll_calls(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn malformed_create_reply_fails_open() {
    let upstream = common::start_upstream("ok").await;
    let control = common::start_control_plane(common::ControlPlaneScript {
        create_body: "not json at all".into(),
        ..Default::default()
    })
    .await;
    let (proxy, shutdown, _updates) = start_proxy(base_config(upstream, Some(control.addr))).await;

    let res = client()
        .get(format!("http://{}/", proxy))
        .header(SQUASH_HEADER, "true")
        .send()
        .await
        .expect("proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(control.poll_calls(), 0);

    shutdown.trigger();
}
