//! Error types raised while registering rewrite rules.
//!
//! Every variant here is a configuration-time failure: a rule that fails to
//! build is never installed. Per-request degradations (unresolved
//! placeholders, failed admission) do not produce errors; they fall back to
//! forwarding the request unchanged.

use thiserror::Error;

/// Boxed error used by deferred admission verdicts.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while compiling a rewrite rule.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The source pattern could not be turned into a matcher.
    #[error("invalid source pattern `{pattern}`: {source}")]
    PatternCompile {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A configured HTTP method is not a valid method token.
    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    /// The destination references a capture the source pattern never defines.
    ///
    /// Only raised when strict placeholder checking is enabled.
    #[error("placeholder `{placeholder}` in `{destination}` has no capture in `{pattern}`")]
    UnresolvedPlaceholder {
        placeholder: String,
        destination: String,
        pattern: String,
    },

    /// A rule with its own source pattern was attached as a route-level rewrite.
    #[error("rule `{0}` has its own source pattern and cannot be attached to a single route")]
    NotCurrentRoute(String),
}
