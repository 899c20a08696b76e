//! Source pattern compilation.
//!
//! # Responsibilities
//! - Turn an Express-style path spec (`/users/:id`, `/files/*`) into an
//!   anchored regular expression
//! - Record the capture names in the order their groups appear
//! - Accept raw regular expressions for sources the path syntax can't express
//!
//! # Design Decisions
//! - Compiled once per rule at registration, never per request
//! - Every path token produces exactly one capturing group, so group `i`
//!   always lines up with capture name `i - 1`
//! - Case-insensitive and trailing-slash tolerant unless configured otherwise
//! - Matching runs against the whole request target, query string included

use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::RewriteError;
use crate::rewrite::params::ParameterIndex;

/// Tokenizer for path specs.
///
/// Groups: 1 escaped char, 2 prefix delimiter, 3 parameter name,
/// 4 custom parameter pattern, 5 unnamed group pattern, 6 modifier,
/// 7 bare asterisk.
static PATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\\.)|([/.])?(?:(?::([A-Za-z0-9_]+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*))",
    )
    .expect("path token regex is valid")
});

/// A source specification for a rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Express path syntax, e.g. `/users/:id(\d+)`.
    Path(String),
    /// A regular expression used as-is.
    Regex(String),
}

impl RoutePattern {
    /// The textual source of the pattern.
    pub fn as_str(&self) -> &str {
        match self {
            RoutePattern::Path(s) | RoutePattern::Regex(s) => s,
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePattern::Path(s) => f.write_str(s),
            RoutePattern::Regex(s) => write!(f, "regex({s})"),
        }
    }
}

impl From<&str> for RoutePattern {
    fn from(s: &str) -> Self {
        RoutePattern::Path(s.to_string())
    }
}

impl From<String> for RoutePattern {
    fn from(s: String) -> Self {
        RoutePattern::Path(s)
    }
}

impl From<Regex> for RoutePattern {
    fn from(re: Regex) -> Self {
        RoutePattern::Regex(re.as_str().to_string())
    }
}

/// Options applied when compiling a path spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Match letter case exactly.
    pub case_sensitive: bool,
    /// Disallow the optional trailing slash.
    pub strict: bool,
}

/// Ordered sequence of captured substrings from one successful match.
///
/// Index 0 is the whole match; 1..N are the capture groups in the order they
/// appear in the pattern. Groups that did not participate are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    groups: Vec<Option<String>>,
}

impl MatchResult {
    pub fn new(groups: Vec<Option<String>>) -> Self {
        Self { groups }
    }

    /// The group at `index`, if it exists and participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Number of entries including the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A source pattern together with its matcher and capture names.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pattern: RoutePattern,
    matcher: Regex,
    captures: Vec<String>,
    index: ParameterIndex,
}

impl CompiledRoute {
    /// Compile `pattern` into a reusable matcher.
    pub fn compile(pattern: RoutePattern, options: PatternOptions) -> Result<Self, RewriteError> {
        let (matcher, captures) = match &pattern {
            RoutePattern::Path(spec) => compile_path(spec, options)?,
            RoutePattern::Regex(source) => compile_regex(source)?,
        };
        let index = ParameterIndex::from_captures(&captures);

        Ok(Self {
            pattern,
            matcher,
            captures,
            index,
        })
    }

    /// Apply the matcher to a candidate request target.
    pub fn matches(&self, target: &str) -> Option<MatchResult> {
        self.matcher.captures(target).map(|caps| {
            MatchResult::new(
                caps.iter()
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect(),
            )
        })
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Capture names in group order.
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    pub fn index(&self) -> &ParameterIndex {
        &self.index
    }

    /// The expanded regular expression, for diagnostics.
    pub fn regex(&self) -> &Regex {
        &self.matcher
    }
}

/// One parameter token of a path spec.
struct ParamToken {
    prefix: Option<char>,
    pattern: String,
    optional: bool,
    repeat: bool,
    partial: bool,
}

fn compile_path(spec: &str, options: PatternOptions) -> Result<(Regex, Vec<String>), RewriteError> {
    let mut route = String::from("^");
    let mut literal = String::new();
    let mut captures = Vec::new();
    let mut unnamed = 0usize;
    let mut last = 0usize;

    for caps in PATH_TOKEN.captures_iter(spec) {
        let whole = caps.get(0).expect("group 0 always participates");
        literal.push_str(&spec[last..whole.start()]);
        last = whole.end();

        if let Some(escaped) = caps.get(1) {
            literal.push_str(&escaped.as_str()[1..]);
            continue;
        }

        route.push_str(&regex::escape(&literal));
        literal.clear();

        let prefix = caps.get(2).and_then(|p| p.as_str().chars().next());
        let modifier = caps.get(6).map(|m| m.as_str());
        let asterisk = caps.get(7).is_some();
        let next = spec[last..].chars().next();
        let delimiter = prefix.unwrap_or('/');

        let name = match caps.get(3) {
            Some(n) => n.as_str().to_string(),
            None => {
                let n = unnamed.to_string();
                unnamed += 1;
                n
            }
        };
        captures.push(name);

        let pattern = match caps.get(4).or_else(|| caps.get(5)) {
            Some(p) => p.as_str().to_string(),
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(&delimiter.to_string())),
        };

        let token = ParamToken {
            prefix,
            pattern,
            optional: matches!(modifier, Some("?") | Some("*")),
            repeat: matches!(modifier, Some("+") | Some("*")),
            partial: prefix.is_some() && next.is_some() && next != prefix,
        };
        route.push_str(&token_regex(&token));
    }

    literal.push_str(&spec[last..]);
    route.push_str(&regex::escape(&literal));

    if !options.strict {
        if route.ends_with('/') {
            route.pop();
        }
        route.push_str("/?");
    }
    route.push('$');

    let matcher = RegexBuilder::new(&route)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|source| RewriteError::PatternCompile {
            pattern: spec.to_string(),
            source,
        })?;

    Ok((matcher, captures))
}

fn token_regex(token: &ParamToken) -> String {
    let prefix = token
        .prefix
        .map(|p| regex::escape(&p.to_string()))
        .unwrap_or_default();
    let mut capture = format!("(?:{})", token.pattern);

    if token.repeat {
        capture = format!("{capture}(?:{prefix}{capture})*");
    }

    if token.optional {
        if token.partial {
            format!("{prefix}({capture})?")
        } else {
            format!("(?:{prefix}({capture}))?")
        }
    } else {
        format!("{prefix}({capture})")
    }
}

fn compile_regex(source: &str) -> Result<(Regex, Vec<String>), RewriteError> {
    let matcher = Regex::new(source).map_err(|source_err| RewriteError::PatternCompile {
        pattern: source.to_string(),
        source: source_err,
    })?;

    let mut unnamed = 0usize;
    let captures = matcher
        .capture_names()
        .skip(1)
        .map(|name| match name {
            Some(n) => n.to_string(),
            None => {
                let n = unnamed.to_string();
                unnamed += 1;
                n
            }
        })
        .collect();

    Ok((matcher, captures))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(spec: &str) -> CompiledRoute {
        CompiledRoute::compile(RoutePattern::from(spec), PatternOptions::default()).unwrap()
    }

    #[test]
    fn test_named_params() {
        let route = compile("/users/:id/posts/:post");
        assert_eq!(route.captures(), &["id".to_string(), "post".to_string()]);

        let m = route.matches("/users/7/posts/hello").unwrap();
        assert_eq!(m.get(0), Some("/users/7/posts/hello"));
        assert_eq!(m.get(1), Some("7"));
        assert_eq!(m.get(2), Some("hello"));

        assert!(route.matches("/users/7").is_none());
        assert!(route.matches("/users//posts/x").is_none());
    }

    #[test]
    fn test_trailing_slash_and_case() {
        let route = compile("/old/:id");
        assert!(route.matches("/old/1/").is_some());
        assert!(route.matches("/OLD/1").is_some());

        let strict = CompiledRoute::compile(
            RoutePattern::from("/old/:id"),
            PatternOptions { case_sensitive: true, strict: true },
        )
        .unwrap();
        assert!(strict.matches("/old/1/").is_none());
        assert!(strict.matches("/OLD/1").is_none());
        assert!(strict.matches("/old/1").is_some());
    }

    #[test]
    fn test_optional_and_custom_params() {
        let route = compile("/archive/:year(\\d{4})/:month?");
        let m = route.matches("/archive/2024").unwrap();
        assert_eq!(m.get(1), Some("2024"));
        assert_eq!(m.get(2), None);

        let m = route.matches("/archive/2024/05").unwrap();
        assert_eq!(m.get(2), Some("05"));

        assert!(route.matches("/archive/24").is_none());
    }

    #[test]
    fn test_unnamed_groups_and_wildcard() {
        let route = compile("/static/*");
        assert_eq!(route.captures(), &["0".to_string()]);
        let m = route.matches("/static/css/site.css").unwrap();
        assert_eq!(m.get(1), Some("css/site.css"));

        let route = compile("/v(\\d+)/:rest*");
        assert_eq!(route.captures(), &["0".to_string(), "rest".to_string()]);
        let m = route.matches("/v2/a/b").unwrap();
        assert_eq!(m.get(1), Some("2"));
        assert_eq!(m.get(2), Some("a/b"));
    }

    #[test]
    fn test_escaped_query_separator() {
        let route = compile("/search\\?q=:q");
        let m = route.matches("/search?q=cats").unwrap();
        assert_eq!(m.get(1), Some("cats"));
    }

    #[test]
    fn test_param_swallows_query_string() {
        let route = compile("/old/:id");
        let m = route.matches("/old/1?x=2").unwrap();
        assert_eq!(m.get(1), Some("1?x=2"));
    }

    #[test]
    fn test_raw_regex_source() {
        let route = CompiledRoute::compile(
            RoutePattern::Regex(r"^/legacy/(\d+)/(?P<slug>[a-z-]+)$".into()),
            PatternOptions::default(),
        )
        .unwrap();
        assert_eq!(route.captures(), &["0".to_string(), "slug".to_string()]);
        assert_eq!(route.index().position("slug"), Some(2));

        let m = route.matches("/legacy/12/hello-world").unwrap();
        assert_eq!(m.get(1), Some("12"));
        assert_eq!(m.get(2), Some("hello-world"));
    }

    #[test]
    fn test_invalid_custom_pattern_is_rejected() {
        let err = CompiledRoute::compile(RoutePattern::from("/x/:id([a-)"), PatternOptions::default())
            .unwrap_err();
        assert!(matches!(err, RewriteError::PatternCompile { .. }));
    }
}
