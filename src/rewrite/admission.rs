//! Optional admission predicate run after a rule has matched.
//!
//! # Responsibilities
//! - Give the predicate the match (or upstream params) it gates on
//! - Accept an immediate verdict or a deferred one
//! - Collapse every outcome into admit / refuse
//!
//! # Design Decisions
//! - The deferred verdict is the only await point of a rewrite
//! - A deferred verdict that fails or times out is a refusal: the request
//!   passes through unchanged
//! - Verdict futures are `'static`; predicates copy whatever they need out of
//!   the context before deferring

use std::future::Future;
use std::time::Duration;

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::error::BoxError;
use crate::rewrite::params::{ParameterIndex, RouteParams};
use crate::rewrite::pattern::MatchResult;

/// What the predicate decided.
pub enum Verdict {
    Ready(bool),
    Deferred(BoxFuture<'static, Result<bool, BoxError>>),
}

impl Verdict {
    /// Wrap a future that settles the verdict later.
    pub fn deferred<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Verdict::Deferred(Box::pin(async move { future.await.map_err(Into::into) }))
    }

    /// Wait for the verdict to settle.
    pub async fn settle(self, timeout: Option<Duration>) -> Admission {
        let future = match self {
            Verdict::Ready(true) => return Admission::Admitted,
            Verdict::Ready(false) => return Admission::Refused,
            Verdict::Deferred(future) => future,
        };

        let settled = match timeout {
            Some(limit) => match tokio::time::timeout(limit, future).await {
                Ok(settled) => settled,
                Err(_) => return Admission::TimedOut,
            },
            None => future.await,
        };

        match settled {
            Ok(true) => Admission::Admitted,
            Ok(false) => Admission::Refused,
            Err(e) => Admission::Failed(e),
        }
    }
}

impl From<bool> for Verdict {
    fn from(admit: bool) -> Self {
        Verdict::Ready(admit)
    }
}

impl std::fmt::Debug for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Ready(admit) => f.debug_tuple("Ready").field(admit).finish(),
            Verdict::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Settled outcome of the admission step.
#[derive(Debug)]
pub enum Admission {
    Admitted,
    Refused,
    Failed(BoxError),
    TimedOut,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Inputs handed to an admission predicate.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    /// The rule's own match; `None` in current-route mode.
    pub matched: Option<&'a MatchResult>,
    pub index: Option<&'a ParameterIndex>,
    /// Parameters from the upstream router.
    pub params: &'a RouteParams,
}

impl<'a> AdmissionContext<'a> {
    /// Value of a named capture, or of the upstream parameter in
    /// current-route mode.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        match (self.matched, self.index) {
            (Some(matched), Some(index)) => index.position(name).and_then(|n| matched.get(n)),
            _ => self.params.get(name),
        }
    }

    /// Positional capture, or the upstream parameter with that numeric key.
    pub fn capture(&self, n: usize) -> Option<&'a str> {
        match self.matched {
            Some(matched) => matched.get(n),
            None => self.params.get(&n.to_string()),
        }
    }
}

/// Predicate that can veto an otherwise matching rewrite.
pub trait AdmissionGate: Send + Sync {
    fn admit(&self, ctx: &AdmissionContext<'_>) -> Verdict;
}

impl<F, R> AdmissionGate for F
where
    F: Fn(&AdmissionContext<'_>) -> R + Send + Sync,
    R: Into<Verdict>,
{
    fn admit(&self, ctx: &AdmissionContext<'_>) -> Verdict {
        self(ctx).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_verdicts() {
        assert!(Verdict::from(true).settle(None).await.is_admitted());
        assert!(matches!(Verdict::from(false).settle(None).await, Admission::Refused));
    }

    #[tokio::test]
    async fn test_deferred_verdicts() {
        let yes = Verdict::deferred(async { Ok::<_, BoxError>(true) });
        assert!(yes.settle(None).await.is_admitted());

        let no = Verdict::deferred(async {
            tokio::task::yield_now().await;
            Ok::<_, BoxError>(false)
        });
        assert!(matches!(no.settle(None).await, Admission::Refused));
    }

    #[tokio::test]
    async fn test_deferred_failure_is_reported() {
        let failed = Verdict::deferred(async { Err::<bool, _>("lookup failed") });
        match failed.settle(None).await {
            Admission::Failed(e) => assert_eq!(e.to_string(), "lookup failed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_timeout() {
        let slow = Verdict::deferred(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BoxError>(true)
        });
        let outcome = slow.settle(Some(Duration::from_millis(50))).await;
        assert!(matches!(outcome, Admission::TimedOut));
    }

    #[test]
    fn test_context_lookup() {
        let matched = MatchResult::new(vec![Some("/u/3".into()), Some("3".into())]);
        let index = ParameterIndex::from_captures(&["id"]);
        let params = RouteParams::new();
        let ctx = AdmissionContext {
            method: &Method::GET,
            url: "/u/3",
            matched: Some(&matched),
            index: Some(&index),
            params: &params,
        };
        assert_eq!(ctx.get("id"), Some("3"));
        assert_eq!(ctx.capture(1), Some("3"));

        let params: RouteParams = [("id", "9")].into_iter().collect();
        let ctx = AdmissionContext {
            method: &Method::GET,
            url: "/u/9",
            matched: None,
            index: None,
            params: &params,
        };
        assert_eq!(ctx.get("id"), Some("9"));
    }

    #[test]
    fn test_closures_are_gates() {
        let gate = |ctx: &AdmissionContext<'_>| *ctx.method == Method::GET;
        let params = RouteParams::new();
        let ctx = AdmissionContext {
            method: &Method::POST,
            url: "/",
            matched: None,
            index: None,
            params: &params,
        };
        assert!(matches!(gate.admit(&ctx), Verdict::Ready(false)));
    }
}
