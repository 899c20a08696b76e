//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect ambiguous rules and duplicate routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RewriteConfig → Result<(), Vec<ValidationError>>
//! - Pattern compilation errors are reported separately, when rules are built

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{MethodsConfig, RewriteConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.mount_prefix `{0}` must start with `/`")]
    InvalidMountPrefix(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("observability.log_level `{0}` is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("rule #{0} has an empty destination")]
    EmptyDestination(usize),

    #[error("rule #{0} sets both `from` and `from_regex`")]
    ConflictingSource(usize),

    #[error("rule #{0} has an empty method name")]
    EmptyMethod(usize),

    #[error("rule name `{0}` is used more than once")]
    DuplicateRuleName(String),

    #[error("route path `{0}` must start with `/` and use `{{param}}` captures")]
    InvalidRoutePath(String),

    #[error("route path `{0}` is configured more than once")]
    DuplicateRoute(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &RewriteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(prefix) = &config.listener.mount_prefix {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidMountPrefix(prefix.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    let mut names = HashSet::new();
    for (i, rule) in config.rules.iter().enumerate() {
        if rule.to.is_empty() {
            errors.push(ValidationError::EmptyDestination(i));
        }
        if rule.from.is_some() && rule.from_regex.is_some() {
            errors.push(ValidationError::ConflictingSource(i));
        }
        if has_empty_method(rule.methods.as_ref()) {
            errors.push(ValidationError::EmptyMethod(i));
        }
        if let Some(name) = &rule.name {
            if !names.insert(name.as_str()) {
                errors.push(ValidationError::DuplicateRuleName(name.clone()));
            }
        }
    }

    let mut paths = HashSet::new();
    for route in &config.routes {
        if !is_router_path(&route.path) {
            errors.push(ValidationError::InvalidRoutePath(route.path.clone()));
        }
        if !paths.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// axum rejects `:param` and `*wildcard` segments at route registration.
fn is_router_path(path: &str) -> bool {
    path.starts_with('/')
        && !path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

fn has_empty_method(methods: Option<&MethodsConfig>) -> bool {
    methods.is_some_and(|m| m.tokens().iter().any(|t| t.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, RuleConfig};

    fn rule(from: Option<&str>, to: &str) -> RuleConfig {
        RuleConfig {
            name: None,
            from: from.map(str::to_string),
            from_regex: None,
            to: to.to_string(),
            methods: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RewriteConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = RewriteConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.observability.log_level = "loud".into();

        let mut conflicting = rule(Some("/a"), "/b");
        conflicting.from_regex = Some("^/a$".into());
        conflicting.methods = Some(MethodsConfig::Many(vec!["GET".into(), " ".into()]));
        config.rules = vec![rule(Some("/x"), ""), conflicting];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("nowhere".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::InvalidLogLevel("loud".into()),
                ValidationError::EmptyDestination(0),
                ValidationError::ConflictingSource(1),
                ValidationError::EmptyMethod(1),
            ]
        );
    }

    #[test]
    fn test_duplicate_names_and_routes() {
        let mut config = RewriteConfig::default();
        let mut a = rule(Some("/a"), "/b");
        a.name = Some("same".into());
        let mut b = rule(None, "/c");
        b.name = Some("same".into());
        config.rules = vec![a, b];
        config.routes = vec![
            RouteConfig { path: "/items/{id}".into(), rewrite: None, methods: None },
            RouteConfig { path: "/items/{id}".into(), rewrite: None, methods: None },
            RouteConfig { path: "items".into(), rewrite: None, methods: None },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateRuleName("same".into())));
        assert!(errors.contains(&ValidationError::DuplicateRoute("/items/{id}".into())));
        assert!(errors.contains(&ValidationError::InvalidRoutePath("items".into())));
    }

    #[test]
    fn test_express_style_route_path_is_rejected() {
        let mut config = RewriteConfig::default();
        config.routes = vec![RouteConfig { path: "/items/:id".into(), rewrite: None, methods: None }];
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidRoutePath("/items/:id".into())])
        );
    }
}
