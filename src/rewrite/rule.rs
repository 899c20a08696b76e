//! Rewrite rules and the per-request orchestration.
//!
//! # Responsibilities
//! - Normalise rule configuration once, at registration
//! - Run method check → pattern match → admission → resolve → mutate
//! - Decide how the pipeline continues after the rule ran
//!
//! # Design Decisions
//! - Rules are immutable after `build`; one rule serves every request
//! - A skipped rule never touches the request
//! - Logging goes through an injected `Dispatch`; a rule without one is silent

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn, Dispatch};

use crate::error::RewriteError;
use crate::rewrite::admission::{Admission, AdmissionContext, AdmissionGate, Verdict};
use crate::rewrite::context::{Query, RequestContext};
use crate::rewrite::method::MethodFilter;
use crate::rewrite::pattern::{CompiledRoute, PatternOptions, RoutePattern};
use crate::rewrite::template::{positional_index, Destination, ResolveSource, Segment};

/// How the pipeline proceeds after a rule ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Continue with the next stage of the current route.
    Advance,
    /// The current route is done; dispatch the rewritten request from the top.
    RestartDispatch,
}

/// Configuration for one rule, normalised by [`RuleBuilder::build`].
pub struct RuleBuilder {
    name: Option<String>,
    source: Option<RoutePattern>,
    destination: String,
    methods: Vec<String>,
    gate: Option<Arc<dyn AdmissionGate>>,
    gate_timeout: Option<Duration>,
    pattern_options: PatternOptions,
    strict_placeholders: bool,
    logger: Option<Dispatch>,
}

impl RuleBuilder {
    fn new(source: Option<RoutePattern>, destination: String) -> Self {
        Self {
            name: None,
            source,
            destination,
            methods: Vec::new(),
            gate: None,
            gate_timeout: None,
            pattern_options: PatternOptions::default(),
            strict_placeholders: false,
            logger: None,
        }
    }

    /// Label used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict the rule to these methods. Case-insensitive; `*` means any.
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Gate the rewrite on a predicate.
    pub fn filter<F, R>(self, predicate: F) -> Self
    where
        F: Fn(&AdmissionContext<'_>) -> R + Send + Sync + 'static,
        R: Into<Verdict>,
    {
        self.gate(Arc::new(predicate))
    }

    pub fn gate(mut self, gate: Arc<dyn AdmissionGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Give up on a deferred verdict after `timeout` and skip the rule.
    pub fn gate_timeout(mut self, timeout: Duration) -> Self {
        self.gate_timeout = Some(timeout);
        self
    }

    pub fn pattern_options(mut self, options: PatternOptions) -> Self {
        self.pattern_options = options;
        self
    }

    /// Reject destinations referring to captures the source never defines.
    pub fn strict_placeholders(mut self, strict: bool) -> Self {
        self.strict_placeholders = strict;
        self
    }

    pub fn logger(mut self, dispatch: Dispatch) -> Self {
        self.logger = Some(dispatch);
        self
    }

    /// Compile the rule.
    pub fn build(self) -> Result<RewriteRule, RewriteError> {
        let methods = MethodFilter::from_tokens(&self.methods)?;
        let destination = Destination::new(self.destination);

        let route = match self.source {
            Some(pattern) => Some(CompiledRoute::compile(pattern, self.pattern_options)?),
            None => None,
        };

        if self.strict_placeholders {
            if let Some(route) = &route {
                check_placeholders(route, &destination)?;
            }
        }

        let name = self.name.unwrap_or_else(|| match &route {
            Some(route) => format!("{} -> {}", route.pattern(), destination.as_str()),
            None => format!("current route -> {}", destination.as_str()),
        });

        let rule = RewriteRule {
            name,
            route,
            destination,
            methods,
            gate: self.gate,
            gate_timeout: self.gate_timeout,
            logger: self.logger,
        };

        rule.log(|| match &rule.route {
            Some(route) => debug!(
                rule = %rule.name,
                regex = %route.regex(),
                methods = %rule.methods,
                "Rewrite rule compiled"
            ),
            None => debug!(
                rule = %rule.name,
                methods = %rule.methods,
                "Current-route rewrite rule compiled"
            ),
        });

        Ok(rule)
    }
}

fn check_placeholders(route: &CompiledRoute, destination: &Destination) -> Result<(), RewriteError> {
    for placeholder in destination.template().placeholders() {
        let resolvable = match placeholder {
            Segment::Positional(digits) => {
                positional_index(digits).is_some_and(|n| n <= route.captures().len())
            }
            Segment::Named(name) => route.index().position(name).is_some(),
            Segment::Literal(_) => true,
        };
        if !resolvable {
            return Err(RewriteError::UnresolvedPlaceholder {
                placeholder: placeholder.to_string(),
                destination: destination.as_str().to_string(),
                pattern: route.pattern().to_string(),
            });
        }
    }
    Ok(())
}

/// A compiled rewrite rule.
pub struct RewriteRule {
    name: String,
    route: Option<CompiledRoute>,
    destination: Destination,
    methods: MethodFilter,
    gate: Option<Arc<dyn AdmissionGate>>,
    gate_timeout: Option<Duration>,
    logger: Option<Dispatch>,
}

impl RewriteRule {
    /// Rewrite requests matching `source` to `destination`.
    pub fn builder(source: impl Into<RoutePattern>, destination: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(Some(source.into()), destination.into())
    }

    /// Rewrite whatever route already matched upstream, using its params.
    pub fn current_route(destination: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(None, destination.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn route(&self) -> Option<&CompiledRoute> {
        self.route.as_ref()
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn methods(&self) -> &MethodFilter {
        &self.methods
    }

    pub fn is_current_route(&self) -> bool {
        self.route.is_none()
    }

    /// Apply the rule to one request.
    ///
    /// On skip the request is left untouched and `Advance` is returned.
    pub async fn apply(&self, req: &mut RequestContext) -> Continuation {
        if !self.methods.allows(&req.method) {
            self.log(|| trace!(rule = %self.name, method = %req.method, "Method not allowed, skipping"));
            return Continuation::Advance;
        }

        let matched = match &self.route {
            Some(route) => match route.matches(&req.url) {
                Some(m) => Some(m),
                None => {
                    self.log(|| trace!(rule = %self.name, url = %req.url, "No match, skipping"));
                    return Continuation::Advance;
                }
            },
            None => None,
        };

        if let Some(gate) = &self.gate {
            let verdict = gate.admit(&AdmissionContext {
                method: &req.method,
                url: &req.url,
                matched: matched.as_ref(),
                index: self.route.as_ref().map(CompiledRoute::index),
                params: &req.params,
            });

            match verdict.settle(self.gate_timeout).await {
                Admission::Admitted => {}
                Admission::Refused => {
                    self.log(|| trace!(rule = %self.name, url = %req.url, "Admission refused, skipping"));
                    return Continuation::Advance;
                }
                Admission::Failed(e) => {
                    self.log(|| warn!(rule = %self.name, url = %req.url, error = %e, "Admission check failed, skipping"));
                    return Continuation::Advance;
                }
                Admission::TimedOut => {
                    self.log(|| warn!(rule = %self.name, url = %req.url, timeout = ?self.gate_timeout, "Admission check timed out, skipping"));
                    return Continuation::Advance;
                }
            }
        }

        let source = match (&self.route, &matched) {
            (Some(route), Some(m)) => ResolveSource::MatchBased {
                matched: m,
                index: route.index(),
            },
            _ => ResolveSource::ParamsBased { params: &req.params },
        };
        let rewritten = self.destination.template().resolve(&source);

        if self.destination.from_root() {
            req.base_url.clear();
        }
        let original = std::mem::replace(&mut req.url, rewritten);
        self.log(|| debug!(rule = %self.name, from = %original, to = %req.url, "Rewrite"));

        if req.url.find('?').is_some_and(|pos| pos > 0) {
            req.query = Query::from_target(&req.url);
            self.log(|| debug!(rule = %self.name, query = ?req.query, "Rewrite updated query"));
        }

        match self.route {
            Some(_) => Continuation::RestartDispatch,
            None => Continuation::Advance,
        }
    }

    fn log(&self, event: impl FnOnce()) {
        if let Some(dispatch) = &self.logger {
            tracing::dispatcher::with_default(dispatch, event);
        }
    }
}

impl fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteRule")
            .field("name", &self.name)
            .field("route", &self.route)
            .field("destination", &self.destination)
            .field("methods", &self.methods)
            .field("gate", &self.gate.is_some())
            .field("gate_timeout", &self.gate_timeout)
            .finish_non_exhaustive()
    }
}
