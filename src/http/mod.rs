//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → layer.rs (pre-routing RuleSet, may change the URI)
//!     → server.rs (request ID, tracing, timeout)
//!     → axum Router dispatches on the rewritten URI
//!     → route.rs (current-route rule with the route's params)
//!     → echo handler
//!
//! request.rs moves state between axum requests and RequestContext.
//! ```
//!
//! # Design Decisions
//! - The rule set sits behind an ArcSwap so it can be replaced at runtime
//! - `RestartDispatch` maps to "the router dispatches on the new URI"

pub mod layer;
pub mod request;
pub mod route;
pub mod server;

pub use layer::{rewrite_request, RewriteLayer, RewriteService, RuleHandle};
pub use request::{
    apply_context, context_from_request, MountPrefix, ParsedQuery, UuidRequestId, WriteBackError,
    X_REQUEST_ID,
};
pub use route::{route_rewrite, with_route_rewrite, RouteRewrite};
pub use server::{Echo, RewriteServer};
