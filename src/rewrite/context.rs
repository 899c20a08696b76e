//! Per-request state a rewrite rule reads and mutates.

use std::collections::BTreeMap;

use axum::http::Method;
use serde::Serialize;

use crate::rewrite::params::RouteParams;

/// A single query value, or every value of a repeated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// The first value for the key.
    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(v) => v,
            QueryValue::Multiple(vs) => vs.first().map(String::as_str).unwrap_or_default(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Multiple(vec![first, value]);
            }
            QueryValue::Multiple(vs) => vs.push(value),
        }
    }
}

/// Parsed query-string mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// Keys without `=` map to an empty value; repeated keys collect every
    /// value in order.
    pub fn parse(raw: &str) -> Self {
        let mut map: BTreeMap<String, QueryValue> = BTreeMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = value.into_owned();
            match map.get_mut(&*key) {
                Some(existing) => existing.push(value),
                None => {
                    map.insert(key.into_owned(), QueryValue::Single(value));
                }
            }
        }
        Self(map)
    }

    /// Parse the query portion of a request target, ignoring any fragment.
    pub fn from_target(target: &str) -> Self {
        match target.split_once('?') {
            Some((_, rest)) => {
                let raw = rest.split_once('#').map(|(q, _)| q).unwrap_or(rest);
                Self::parse(raw)
            }
            None => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Mutable state of one in-flight request.
///
/// Built by the framework adapter per request. Rules only touch `url`,
/// `query`, and `base_url`; `method` and `params` are read-only inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Request target: path plus optional query string.
    pub url: String,
    pub method: Method,
    /// Parameters already resolved by the upstream router.
    pub params: RouteParams,
    pub query: Query,
    /// Mount prefix of the application handling the request.
    pub base_url: String,
}

impl RequestContext {
    /// Create a context, parsing the query from `url`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let query = Query::from_target(&url);
        Self {
            url,
            method,
            params: RouteParams::default(),
            query,
            base_url: String::new(),
        }
    }

    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
