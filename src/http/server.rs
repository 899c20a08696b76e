//! Demo HTTP server.
//!
//! # Responsibilities
//! - Create the Axum Router with echo routes and their route-level rewrites
//! - Wire up middleware (timeout, tracing, request ID)
//! - Wrap the router with the pre-routing rewrite layer
//! - Serve until the shutdown signal fires
//!
//! # Design Decisions
//! - Every route answers with an echo of what the handler saw, so rewrites
//!   are observable from the outside
//! - Unmatched paths fall back to the same echo instead of 404

use std::time::Duration;

use axum::extract::{OriginalUri, Request};
use axum::http::uri::PathAndQuery;
use axum::http::StatusCode;
use axum::routing::any;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Dispatch;

use crate::config::{build_route_rule, ConfigError, RewriteConfig};
use crate::http::layer::{RewriteLayer, RewriteService, RuleHandle};
use crate::http::request::{MountPrefix, ParsedQuery, UuidRequestId, X_REQUEST_ID};
use crate::http::route::{with_route_rewrite, RouteRewrite};
use crate::lifecycle::ShutdownSignal;
use crate::rewrite::{Query, RuleSet};

/// Body returned by the echo handler.
#[derive(Debug, Clone, Serialize)]
pub struct Echo {
    pub method: String,
    pub url: String,
    pub original_url: String,
    pub query: Query,
    pub base_url: String,
    pub request_id: Option<String>,
}

/// HTTP server demonstrating the rewrite layer.
pub struct RewriteServer {
    router: Router,
    rules: RuleHandle,
    config: RewriteConfig,
}

impl RewriteServer {
    /// Build the server. Route-level rewrites are compiled here; `rules` is
    /// the pre-routing set.
    pub fn new(
        config: RewriteConfig,
        rules: RuleSet,
        logger: Option<&Dispatch>,
    ) -> Result<Self, ConfigError> {
        let router = Self::build_router(&config, logger)?;
        Ok(Self {
            router,
            rules: RuleHandle::new(rules),
            config,
        })
    }

    fn build_router(config: &RewriteConfig, logger: Option<&Dispatch>) -> Result<Router, ConfigError> {
        let mut router = Router::new();

        for route in &config.routes {
            let mut handler = any(echo);
            if let Some(rule) = build_route_rule(route, logger)? {
                let rewrite = RouteRewrite::new(rule).map_err(|source| ConfigError::Rule {
                    rule: route.path.clone(),
                    source,
                })?;
                handler = with_route_rewrite(handler, rewrite);
            }
            router = router.route(&route.path, handler);
        }

        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        Ok(with_middleware(router.fallback(echo), request_timeout))
    }

    /// Handle for swapping the pre-routing rules while serving.
    pub fn rules(&self) -> RuleHandle {
        self.rules.clone()
    }

    /// The routed application wrapped in the rewrite layer.
    pub fn app(&self) -> RewriteService<Router> {
        let mut layer = RewriteLayer::new(self.rules.clone());
        if let Some(prefix) = &self.config.listener.mount_prefix {
            layer = layer.mount_prefix(prefix.clone());
        }
        layer.layer(self.router.clone())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.rules.load().len(),
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        let app = axum::ServiceExt::<Request>::into_make_service(self.app());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }
}

/// Timeout, request ID, and tracing layers shared by every route.
fn with_middleware(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

/// Echo what the handler sees after all rewrites.
async fn echo(req: Request) -> Json<Echo> {
    let url = req
        .uri()
        .path_and_query()
        .map(PathAndQuery::as_str)
        .unwrap_or_else(|| req.uri().path())
        .to_string();
    let extensions = req.extensions();

    let original_url = extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.to_string())
        .unwrap_or_else(|| url.clone());
    let query = extensions
        .get::<ParsedQuery>()
        .map(|ParsedQuery(q)| q.clone())
        .unwrap_or_else(|| Query::from_target(&url));
    let base_url = extensions
        .get::<MountPrefix>()
        .map(|MountPrefix(p)| p.clone())
        .unwrap_or_default();
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!(method = %req.method(), url = %url, original = %original_url, "Echo");

    Json(Echo {
        method: req.method().to_string(),
        url,
        original_url,
        query,
        base_url,
        request_id,
    })
}
