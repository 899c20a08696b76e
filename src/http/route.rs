//! Route-level rewrites.
//!
//! # Responsibilities
//! - Run a current-route rule after axum has matched a route, as a layer
//!   around the route's method router
//! - Feed the route's path parameters to placeholder resolution
//!
//! # Design Decisions
//! - Only current-route rules are accepted; a rule with its own pattern
//!   belongs in the pre-routing [`RewriteLayer`](crate::http::RewriteLayer)
//! - The handler always runs afterwards, rewritten or not

use std::sync::Arc;

use axum::extract::{RawPathParams, Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::MethodRouter;

use crate::error::RewriteError;
use crate::http::request::{apply_context, context_from_request};
use crate::rewrite::{RewriteRule, RouteParams};

/// A current-route rule bound to one route.
#[derive(Debug, Clone)]
pub struct RouteRewrite {
    rule: Arc<RewriteRule>,
}

impl RouteRewrite {
    pub fn new(rule: RewriteRule) -> Result<Self, RewriteError> {
        if !rule.is_current_route() {
            return Err(RewriteError::NotCurrentRoute(rule.name().to_string()));
        }
        Ok(Self {
            rule: Arc::new(rule),
        })
    }

    pub fn rule(&self) -> &RewriteRule {
        &self.rule
    }
}

/// Middleware body for [`with_route_rewrite`].
pub async fn route_rewrite(
    State(rewrite): State<RouteRewrite>,
    raw: RawPathParams,
    mut req: Request,
    next: Next,
) -> Response {
    let params: RouteParams = raw.iter().collect();
    let mut ctx = context_from_request(&req, params);
    rewrite.rule.apply(&mut ctx).await;

    let target = ctx.url.clone();
    if let Err(e) = apply_context(&mut req, ctx) {
        tracing::warn!(
            rule = %rewrite.rule.name(),
            url = %target,
            error = %e,
            "Rewritten target rejected, forwarding unchanged"
        );
    }

    next.run(req).await
}

/// Attach `rewrite` to a method router so it runs only when that route matched.
pub fn with_route_rewrite<S>(route: MethodRouter<S>, rewrite: RouteRewrite) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    // `any` routers reject `route_layer`.
    route.layer(from_fn_with_state(rewrite, route_rewrite))
}
