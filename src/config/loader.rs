//! Configuration loading from disk and rule compilation.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::Dispatch;

use crate::config::schema::{MatchingConfig, RewriteConfig, RouteConfig, RuleConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::error::RewriteError;
use crate::rewrite::{RewriteRule, RoutePattern, RuleBuilder, RuleSet};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Rule `{rule}` rejected: {source}")]
    Rule {
        rule: String,
        #[source]
        source: RewriteError,
    },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RewriteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RewriteConfig, ConfigError> {
    let config: RewriteConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Compile the configured rewrite rules, in order.
pub fn build_rule_set(config: &RewriteConfig, logger: Option<&Dispatch>) -> Result<RuleSet, ConfigError> {
    config
        .rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let label = rule.name.clone().unwrap_or_else(|| format!("#{i}"));
            rule_builder(rule, &config.matching, logger)
                .build()
                .map_err(|source| ConfigError::Rule { rule: label, source })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(RuleSet::new)
}

/// Compile the current-route rewrite attached to an echo route, if any.
pub fn build_route_rule(
    route: &RouteConfig,
    logger: Option<&Dispatch>,
) -> Result<Option<RewriteRule>, ConfigError> {
    let Some(destination) = &route.rewrite else {
        return Ok(None);
    };

    let mut builder = RewriteRule::current_route(destination.clone()).name(route.path.clone());
    if let Some(methods) = &route.methods {
        builder = builder.methods(methods.tokens());
    }
    if let Some(dispatch) = logger {
        builder = builder.logger(dispatch.clone());
    }

    builder.build().map(Some).map_err(|source| ConfigError::Rule {
        rule: route.path.clone(),
        source,
    })
}

fn rule_builder(rule: &RuleConfig, matching: &MatchingConfig, logger: Option<&Dispatch>) -> RuleBuilder {
    let source = match (&rule.from, &rule.from_regex) {
        (Some(path), _) => Some(RoutePattern::Path(path.clone())),
        (None, Some(re)) => Some(RoutePattern::Regex(re.clone())),
        (None, None) => None,
    };

    let mut builder = match source {
        Some(pattern) => RewriteRule::builder(pattern, rule.to.clone()),
        None => RewriteRule::current_route(rule.to.clone()),
    }
    .pattern_options(matching.pattern_options())
    .strict_placeholders(matching.strict_placeholders);

    if let Some(name) = &rule.name {
        builder = builder.name(name.clone());
    }
    if let Some(methods) = &rule.methods {
        builder = builder.methods(methods.tokens());
    }
    if let Some(dispatch) = logger {
        builder = builder.logger(dispatch.clone());
    }
    builder
}
