//! Pre-routing rewrite layer.
//!
//! Wraps a whole router so that dispatch sees the rewritten URI. Layers added
//! with `Router::layer` run after routing and cannot change which route
//! handles the request; this one must sit outside the router.

use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use axum::extract::OriginalUri;
use axum::http::Request;
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::http::request::{apply_context, context_from_request, MountPrefix};
use crate::rewrite::{Continuation, RouteParams, RuleSet};

/// Shared, swappable handle to the active rule set.
#[derive(Debug, Clone)]
pub struct RuleHandle(Arc<ArcSwap<RuleSet>>);

impl RuleHandle {
    pub fn new(rules: RuleSet) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(rules)))
    }

    /// The rule set new requests will use.
    pub fn load(&self) -> Arc<RuleSet> {
        self.0.load_full()
    }

    /// Swap in a new rule set. In-flight requests keep the old one.
    pub fn replace(&self, rules: RuleSet) {
        self.0.store(Arc::new(rules));
    }
}

/// [`Layer`] applying a [`RuleSet`] before the inner service routes.
#[derive(Debug, Clone)]
pub struct RewriteLayer {
    rules: RuleHandle,
    mount_prefix: Option<String>,
}

impl RewriteLayer {
    pub fn new(rules: RuleHandle) -> Self {
        Self {
            rules,
            mount_prefix: None,
        }
    }

    /// Report `prefix` as the mount prefix of requests that don't carry one.
    pub fn mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = Some(prefix.into());
        self
    }
}

impl<S> Layer<S> for RewriteLayer {
    type Service = RewriteService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RewriteService {
            inner,
            rules: self.rules.clone(),
            mount_prefix: self.mount_prefix.clone(),
        }
    }
}

/// Service produced by [`RewriteLayer`].
#[derive(Debug, Clone)]
pub struct RewriteService<S> {
    inner: S,
    rules: RuleHandle,
    mount_prefix: Option<String>,
}

impl<S, B> Service<Request<B>> for RewriteService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let rules = self.rules.load();

        if req.extensions().get::<OriginalUri>().is_none() {
            let original = OriginalUri(req.uri().clone());
            req.extensions_mut().insert(original);
        }
        if let Some(prefix) = &self.mount_prefix {
            if req.extensions().get::<MountPrefix>().is_none() {
                req.extensions_mut().insert(MountPrefix(prefix.clone()));
            }
        }

        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            rewrite_request(&rules, &mut req).await;
            inner.call(req).await
        })
    }
}

/// Run `rules` against `req`, writing any rewrite back onto its URI.
///
/// Route parameters are taken from a [`RouteParams`] extension when an outer
/// layer provided one.
pub async fn rewrite_request<B>(rules: &RuleSet, req: &mut Request<B>) -> Continuation {
    let params = req
        .extensions()
        .get::<RouteParams>()
        .cloned()
        .unwrap_or_default();
    let mut ctx = context_from_request(req, params);
    let continuation = rules.apply(&mut ctx).await;

    let target = ctx.url.clone();
    if let Err(e) = apply_context(req, ctx) {
        tracing::warn!(url = %target, error = %e, "Rewritten target rejected, forwarding unchanged");
    }
    continuation
}
