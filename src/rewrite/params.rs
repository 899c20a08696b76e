//! Capture name lookup and upstream route parameters.

use std::collections::HashMap;

/// Maps a capture name to its 1-based position in a [`MatchResult`].
///
/// Duplicate names overwrite earlier entries: the last group with a given
/// name wins.
///
/// [`MatchResult`]: crate::rewrite::MatchResult
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterIndex {
    positions: HashMap<String, usize>,
}

impl ParameterIndex {
    /// Build the index from capture names listed in group order.
    pub fn from_captures<S: AsRef<str>>(captures: &[S]) -> Self {
        let positions = captures
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref().to_string(), i + 1))
            .collect();
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Route parameters resolved by the upstream router.
///
/// Positional parameters use their decimal index as key (`"0"`, `"1"`, ...),
/// named parameters their name. Order of insertion is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, String)>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_positions_are_one_based() {
        let index = ParameterIndex::from_captures(&["user", "post"]);
        assert_eq!(index.position("user"), Some(1));
        assert_eq!(index.position("post"), Some(2));
        assert_eq!(index.position("missing"), None);
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let index = ParameterIndex::from_captures(&["id", "team", "id"]);
        assert_eq!(index.position("id"), Some(3));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_route_params_replace_in_place() {
        let mut params: RouteParams = [("id", "1"), ("0", "x")].into_iter().collect();
        params.insert("id", "2");
        assert_eq!(params.get("id"), Some("2"));
        assert_eq!(params.get("0"), Some("x"));
        assert_eq!(params.iter().next(), Some(("id", "2")));
    }
}
