//! Destination template parsing and placeholder substitution.
//!
//! # Responsibilities
//! - Split a destination template into literal text and placeholders
//! - Resolve placeholders from a fresh match or from upstream route params
//! - Handle the `//` escape that rewrites relative to the application root
//!
//! # Design Decisions
//! - Templates are parsed once at registration; resolution is a pure function
//! - Unresolved placeholders become the literal text `undefined`
//! - No validation or canonicalisation of the resolved path

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::rewrite::params::{ParameterIndex, RouteParams};
use crate::rewrite::pattern::MatchResult;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([0-9]+)|:([A-Za-z0-9_]+)").expect("placeholder regex is valid")
});

/// Text substituted for a placeholder with no value.
pub const UNRESOLVED: &str = "undefined";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `$N`; the digits are kept verbatim.
    Positional(String),
    /// `:name`
    Named(String),
}

/// Capture number named by the digits of a `$N` placeholder.
///
/// Leading zeros (`$01`) name no capture.
pub(crate) fn positional_index(digits: &str) -> Option<usize> {
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// Where placeholder values come from for one resolution.
#[derive(Debug, Clone, Copy)]
pub enum ResolveSource<'a> {
    /// The rule's own pattern matched this request.
    MatchBased {
        matched: &'a MatchResult,
        index: &'a ParameterIndex,
    },
    /// Current-route mode: read the upstream router's parameters.
    ParamsBased { params: &'a RouteParams },
}

impl ResolveSource<'_> {
    fn positional(&self, digits: &str) -> Option<&str> {
        match self {
            ResolveSource::MatchBased { matched, .. } => {
                positional_index(digits).and_then(|n| matched.get(n))
            }
            ResolveSource::ParamsBased { params } => {
                positional_index(digits).and_then(|_| params.get(digits))
            }
        }
    }

    fn named(&self, name: &str) -> Option<&str> {
        match self {
            ResolveSource::MatchBased { matched, index } => {
                index.position(name).and_then(|n| matched.get(n))
            }
            ResolveSource::ParamsBased { params } => params.get(name),
        }
    }
}

/// A destination template split into segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let whole = caps.get(0).expect("group 0 always participates");
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            last = whole.end();

            let segment = match (caps.get(1), caps.get(2)) {
                (Some(digits), _) => Segment::Positional(digits.as_str().to_string()),
                (None, Some(name)) => Segment::Named(name.as_str().to_string()),
                (None, None) => unreachable!("placeholder regex has two alternatives"),
            };
            segments.push(segment);
        }

        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholders in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| !matches!(s, Segment::Literal(_)))
    }

    pub fn resolve(&self, source: &ResolveSource<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let value = match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Positional(digits) => source.positional(digits).unwrap_or(UNRESOLVED),
                Segment::Named(name) => source.named(name).unwrap_or(UNRESOLVED),
            };
            out.push_str(value);
        }
        out
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Positional(digits) => write!(f, "${digits}"),
            Segment::Named(name) => write!(f, ":{name}"),
        }
    }
}

/// A rule's destination: the parsed template plus the `//` escape flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    raw: String,
    template: Template,
    from_root: bool,
}

impl Destination {
    /// Parse a destination.
    ///
    /// A leading `//` marks the destination as absolute from the application
    /// root; exactly one of the two slashes is dropped before substitution.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (from_root, body) = match raw.strip_prefix("//") {
            Some(_) => (true, &raw[1..]),
            None => (false, raw.as_str()),
        };
        let template = Template::parse(body);
        Self {
            raw,
            template,
            from_root,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Whether resolving this destination clears the mount prefix.
    pub fn from_root(&self) -> bool {
        self.from_root
    }
}

/// Resolve `template` against `source` in one step.
pub fn resolve_template(template: &str, source: &ResolveSource<'_>) -> String {
    Template::parse(template).resolve(source)
}
