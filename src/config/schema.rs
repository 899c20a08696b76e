//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the rewrite
//! server. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::rewrite::PatternOptions;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RewriteConfig {
    /// Listener configuration (bind address, mount prefix).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Pattern compilation settings shared by every rule.
    pub matching: MatchingConfig,

    /// Rewrite rules, applied in order before routing.
    pub rules: Vec<RuleConfig>,

    /// Routes served by the built-in echo handler.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Prefix the application is mounted under; reported to handlers and
    /// cleared by `//` destinations.
    pub mount_prefix: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mount_prefix: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Pattern compilation settings.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MatchingConfig {
    /// Match letter case exactly.
    pub case_sensitive: bool,

    /// Disallow the optional trailing slash.
    pub strict: bool,

    /// Fail at startup when a destination names a capture its source lacks.
    pub strict_placeholders: bool,
}

impl MatchingConfig {
    pub fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            case_sensitive: self.case_sensitive,
            strict: self.strict,
        }
    }
}

/// A single method or a list of methods.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MethodsConfig {
    One(String),
    Many(Vec<String>),
}

impl MethodsConfig {
    pub fn tokens(&self) -> Vec<String> {
        match self {
            MethodsConfig::One(m) => vec![m.clone()],
            MethodsConfig::Many(ms) => ms.clone(),
        }
    }
}

/// Rewrite rule configuration.
///
/// Without `from`/`from_regex` the rule runs in current-route mode.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RuleConfig {
    /// Label for logging.
    #[serde(default)]
    pub name: Option<String>,

    /// Source path in Express syntax (`/users/:id`).
    #[serde(default)]
    pub from: Option<String>,

    /// Source as a raw regular expression.
    #[serde(default)]
    pub from_regex: Option<String>,

    /// Destination template (`/people/$1`, `/people/:id`, `//root/:id`).
    pub to: String,

    /// Methods the rule applies to (default: all).
    #[serde(default)]
    pub methods: Option<MethodsConfig>,
}

/// Echo route configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Route path in router syntax (`/items/{id}`).
    pub path: String,

    /// Current-route rewrite applied after this route matched.
    #[serde(default)]
    pub rewrite: Option<String>,

    /// Methods the route rewrite applies to (default: all).
    #[serde(default)]
    pub methods: Option<MethodsConfig>,
}
