//! URL rewriting middleware for axum.
//!
//! Rules map a request target matching a source pattern onto a destination
//! template, before routing (`RewriteLayer`) or on an already matched route
//! (`with_route_rewrite`).

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;

pub use config::schema::RewriteConfig;
pub use error::{BoxError, RewriteError};
pub use http::{RewriteLayer, RewriteServer, RouteRewrite, RuleHandle};
pub use lifecycle::Shutdown;
pub use rewrite::{Continuation, RequestContext, RewriteRule, RuleSet};
