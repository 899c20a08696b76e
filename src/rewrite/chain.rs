//! Ordered rule chains.

use std::sync::Arc;

use crate::rewrite::context::RequestContext;
use crate::rewrite::rule::{Continuation, RewriteRule};

/// Rules applied in order, like consecutive pipeline stages.
///
/// Each rule sees the target as left by the rules before it, so rewrites
/// compose. The set reports `RestartDispatch` when any rule did.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<RewriteRule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self {
            rules: rules.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn push(&mut self, rule: RewriteRule) {
        self.rules.push(Arc::new(rule));
    }

    pub fn rules(&self) -> &[Arc<RewriteRule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub async fn apply(&self, req: &mut RequestContext) -> Continuation {
        let mut outcome = Continuation::Advance;
        for rule in &self.rules {
            if rule.apply(req).await == Continuation::RestartDispatch {
                outcome = Continuation::RestartDispatch;
            }
        }
        outcome
    }
}

impl FromIterator<RewriteRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = RewriteRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::*;

    #[tokio::test]
    async fn test_later_rules_see_earlier_rewrites() {
        let set: RuleSet = [
            RewriteRule::current_route("/stage-one").build().unwrap(),
            RewriteRule::builder("/stage-one", "/stage-two").build().unwrap(),
            RewriteRule::builder("/stage-two", "/stage-three").build().unwrap(),
        ]
        .into_iter()
        .collect();

        let mut req = RequestContext::new(Method::GET, "/anything");
        assert_eq!(set.apply(&mut req).await, Continuation::RestartDispatch);
        assert_eq!(req.url, "/stage-three");
    }

    #[tokio::test]
    async fn test_earlier_rules_do_not_see_later_rewrites() {
        let set = RuleSet::new(vec![
            RewriteRule::builder("/b", "/c").build().unwrap(),
            RewriteRule::builder("/a", "/b").build().unwrap(),
        ]);

        let mut req = RequestContext::new(Method::GET, "/a");
        assert_eq!(set.apply(&mut req).await, Continuation::RestartDispatch);
        assert_eq!(req.url, "/b");
    }

    #[tokio::test]
    async fn test_current_route_rules_alone_advance() {
        let set = RuleSet::new(vec![RewriteRule::current_route("/x").build().unwrap()]);
        let mut req = RequestContext::new(Method::GET, "/y");
        assert_eq!(set.apply(&mut req).await, Continuation::Advance);
        assert_eq!(req.url, "/x");
    }

    #[tokio::test]
    async fn test_no_match_advances() {
        let set = RuleSet::new(vec![RewriteRule::builder("/a", "/b").build().unwrap()]);
        let mut req = RequestContext::new(Method::GET, "/c");
        assert_eq!(set.apply(&mut req).await, Continuation::Advance);
        assert_eq!(req.url, "/c");
    }
}
