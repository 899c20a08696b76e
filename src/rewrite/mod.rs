//! Rewrite resolution engine.
//!
//! # Data Flow
//! ```text
//! Registration (once per rule):
//!     source pattern → pattern.rs (regex + capture names)
//!                    → params.rs (name → position index)
//!     destination    → template.rs (segments, `//` escape)
//!     methods        → method.rs (normalised allow-set)
//!     → RewriteRule (immutable, shared)
//!
//! Per request (rule.rs):
//!     RequestContext
//!     → method check ── fail ─┐
//!     → pattern match ─ fail ─┤
//!     → admission.rs ── fail ─┤
//!     → resolve + mutate      │
//!     → RestartDispatch | Advance ◀── Advance (untouched)
//! ```
//!
//! # Design Decisions
//! - Everything that can fail does so at registration
//! - The only await point is a deferred admission verdict
//! - Rules carry no per-request state and need no locking

pub mod admission;
pub mod chain;
pub mod context;
pub mod method;
pub mod params;
pub mod pattern;
pub mod rule;
pub mod template;

pub use admission::{Admission, AdmissionContext, AdmissionGate, Verdict};
pub use chain::RuleSet;
pub use context::{Query, QueryValue, RequestContext};
pub use method::MethodFilter;
pub use params::{ParameterIndex, RouteParams};
pub use pattern::{CompiledRoute, MatchResult, PatternOptions, RoutePattern};
pub use rule::{Continuation, RewriteRule, RuleBuilder};
pub use template::{resolve_template, Destination, ResolveSource, Template};
