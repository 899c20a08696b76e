//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url_rewrite::config::{build_rule_set, parse_config};
use url_rewrite::http::RewriteService;
use url_rewrite::lifecycle::Shutdown;
use url_rewrite::{RewriteServer, RuleSet};

/// Server built from TOML text, with the rule set the config describes.
pub fn server_from_toml(toml: &str) -> RewriteServer {
    let config = parse_config(toml).unwrap();
    let rules = build_rule_set(&config, None).unwrap();
    RewriteServer::new(config, rules, None).unwrap()
}

/// Server with default config and the given pre-routing rules.
#[allow(dead_code)]
pub fn server_with_rules(rules: RuleSet) -> RewriteServer {
    RewriteServer::new(Default::default(), rules, None).unwrap()
}

/// Send one request through `app` and decode the echo body.
#[allow(dead_code)]
pub async fn echo(
    app: RewriteService<Router>,
    method: Method,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Serve `server` on an ephemeral port until the returned handle is triggered.
#[allow(dead_code)]
pub async fn spawn_server(server: RewriteServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.signal();

    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    (addr, shutdown)
}
