//! HTTP method filtering for rewrite rules.
//!
//! Method names are case-insensitive and normalised to upper case when the
//! rule is built. An absent list, an empty list, or a list containing `*`
//! admits every method.

use std::collections::BTreeSet;
use std::fmt;

use axum::http::Method;

use crate::error::RewriteError;

/// Set of methods a rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MethodFilter {
    #[default]
    Any,
    Only(BTreeSet<String>),
}

impl MethodFilter {
    /// Normalise a list of method tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, RewriteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut methods = BTreeSet::new();
        for token in tokens {
            let token = token.as_ref().trim();
            if token == "*" {
                return Ok(MethodFilter::Any);
            }
            let upper = token.to_ascii_uppercase();
            Method::from_bytes(upper.as_bytes())
                .map_err(|_| RewriteError::InvalidMethod(token.to_string()))?;
            methods.insert(upper);
        }

        if methods.is_empty() {
            Ok(MethodFilter::Any)
        } else {
            Ok(MethodFilter::Only(methods))
        }
    }

    /// Whether a request with `method` may be rewritten.
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(methods) => {
                methods.contains(&method.as_str().to_ascii_uppercase())
            }
        }
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodFilter::Any => f.write_str("*"),
            MethodFilter::Only(methods) => {
                let list: Vec<&str> = methods.iter().map(String::as_str).collect();
                f.write_str(&list.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_admits_everything() {
        let filter = MethodFilter::default();
        assert!(filter.allows(&Method::GET));
        assert!(filter.allows(&Method::DELETE));
    }

    #[test]
    fn test_case_normalisation_is_idempotent() {
        let lower = MethodFilter::from_tokens(["get"]).unwrap();
        let upper = MethodFilter::from_tokens(["GET"]).unwrap();
        assert_eq!(lower, upper);

        for method in [Method::GET, Method::POST, Method::PUT, Method::HEAD] {
            assert_eq!(lower.allows(&method), upper.allows(&method));
        }
        assert!(lower.allows(&Method::GET));
        assert!(!lower.allows(&Method::POST));
    }

    #[test]
    fn test_wildcard_and_empty_lists() {
        assert_eq!(MethodFilter::from_tokens(["get", "*"]).unwrap(), MethodFilter::Any);
        assert_eq!(
            MethodFilter::from_tokens(Vec::<String>::new()).unwrap(),
            MethodFilter::Any
        );
    }

    #[test]
    fn test_extension_methods_compare_case_insensitively() {
        let filter = MethodFilter::from_tokens(["purge"]).unwrap();
        let method = Method::from_bytes(b"purge").unwrap();
        assert!(filter.allows(&method));
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let err = MethodFilter::from_tokens(["GE T"]).unwrap_err();
        assert!(matches!(err, RewriteError::InvalidMethod(m) if m == "GE T"));
    }
}
