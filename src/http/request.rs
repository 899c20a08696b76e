//! Moving request state between axum requests and the rewrite engine.
//!
//! # Responsibilities
//! - Build a `RequestContext` from an incoming request
//! - Write a rewritten target back onto the request URI
//! - Carry the parsed query and mount prefix as request extensions
//! - Generate `x-request-id` values
//!
//! # Design Decisions
//! - A rewritten target that is not a valid URI leaves the request unchanged
//! - Scheme and authority of absolute-form URIs are preserved

use axum::http::uri::{InvalidUri, InvalidUriParts, PathAndQuery};
use axum::http::{HeaderValue, Request, Uri};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::rewrite::{Query, RequestContext, RouteParams};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Prefix the application is mounted under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPrefix(pub String);

/// Query mapping produced by the last rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery(pub Query);

/// Failure to turn a rewritten target back into a URI.
#[derive(Debug, Error)]
pub enum WriteBackError {
    #[error("rewritten target is not a valid path: {0}")]
    Target(#[from] InvalidUri),

    #[error("rewritten target does not form a URI: {0}")]
    Parts(#[from] InvalidUriParts),
}

/// Snapshot the parts of `req` a rewrite rule works on.
pub fn context_from_request<B>(req: &Request<B>, params: RouteParams) -> RequestContext {
    let uri = req.uri();
    let target = uri
        .path_and_query()
        .map(PathAndQuery::as_str)
        .unwrap_or_else(|| uri.path());

    let mut ctx = RequestContext::new(req.method().clone(), target).with_params(params);
    if let Some(MountPrefix(prefix)) = req.extensions().get::<MountPrefix>() {
        ctx.base_url = prefix.clone();
    }
    if let Some(ParsedQuery(query)) = req.extensions().get::<ParsedQuery>() {
        ctx.query = query.clone();
    }
    ctx
}

/// Write a rewritten context back onto `req`.
///
/// Leaves `req` untouched when the target did not change.
pub fn apply_context<B>(req: &mut Request<B>, ctx: RequestContext) -> Result<(), WriteBackError> {
    let current = req.uri().path_and_query().map(PathAndQuery::as_str);
    let base_changed = req
        .extensions()
        .get::<MountPrefix>()
        .map_or(!ctx.base_url.is_empty(), |MountPrefix(p)| *p != ctx.base_url);

    if current == Some(ctx.url.as_str()) && !base_changed {
        return Ok(());
    }

    let path_and_query = PathAndQuery::try_from(ctx.url.as_str())?;
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    let uri = Uri::from_parts(parts)?;

    *req.uri_mut() = uri;
    req.extensions_mut().insert(ParsedQuery(ctx.query));
    req.extensions_mut().insert(MountPrefix(ctx.base_url));
    Ok(())
}

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Method;

    use super::*;
    use crate::rewrite::QueryValue;

    #[test]
    fn test_round_trip_of_rewritten_target() {
        let mut req = Request::builder()
            .method(Method::GET)
            .uri("http://example.com/old/1?x=1")
            .body(Body::empty())
            .unwrap();

        let mut ctx = context_from_request(&req, RouteParams::new());
        assert_eq!(ctx.url, "/old/1?x=1");
        assert_eq!(ctx.query.get("x").map(QueryValue::first), Some("1"));

        ctx.url = "/new/1?y=2".into();
        ctx.query = Query::parse("y=2");
        apply_context(&mut req, ctx).unwrap();

        assert_eq!(req.uri().to_string(), "http://example.com/new/1?y=2");
        let ParsedQuery(query) = req.extensions().get::<ParsedQuery>().unwrap();
        assert_eq!(query.get("y").map(QueryValue::first), Some("2"));
    }

    #[test]
    fn test_unchanged_context_is_a_no_op() {
        let mut req = Request::builder().uri("/same").body(Body::empty()).unwrap();
        let ctx = context_from_request(&req, RouteParams::new());
        apply_context(&mut req, ctx).unwrap();
        assert!(req.extensions().get::<ParsedQuery>().is_none());
    }

    #[test]
    fn test_cleared_mount_prefix_is_written_back() {
        let mut req = Request::builder().uri("/legacy").body(Body::empty()).unwrap();
        req.extensions_mut().insert(MountPrefix("/blog".into()));

        let mut ctx = context_from_request(&req, RouteParams::new());
        assert_eq!(ctx.base_url, "/blog");
        ctx.base_url.clear();
        ctx.url = "/root".into();
        apply_context(&mut req, ctx).unwrap();

        assert_eq!(req.extensions().get::<MountPrefix>(), Some(&MountPrefix(String::new())));
    }

    #[test]
    fn test_invalid_target_is_rejected() {
        let mut req = Request::builder().uri("/a").body(Body::empty()).unwrap();
        let mut ctx = context_from_request(&req, RouteParams::new());
        ctx.url = "/has space".into();
        assert!(apply_context(&mut req, ctx).is_err());
        assert_eq!(req.uri(), "/a");
    }

    #[test]
    fn test_request_ids_are_uuids() {
        let req = Request::builder().body(()).unwrap();
        let id = UuidRequestId.make_request_id(&req).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
