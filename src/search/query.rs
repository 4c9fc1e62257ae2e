//! Query normalization, tokenization and mode selection.

use serde::Serialize;

use crate::sharding::regions::normalize_code;

/// Search algorithm used for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum SearchMode {
    /// Prefix match on the primary field.
    Basic,
    /// Multi-term, multi-field weighted ranking.
    Advanced,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Basic => "basic",
            SearchMode::Advanced => "advanced",
        }
    }
}

impl From<SearchMode> for &'static str {
    fn from(mode: SearchMode) -> Self {
        mode.as_str()
    }
}

/// Trim and lowercase.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A normalized search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub region_filter: Option<String>,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(text: &str, region: Option<&str>, limit: usize) -> Self {
        let region_filter = region
            .map(normalize_code)
            .filter(|r| !r.is_empty());
        Self {
            text: normalize(text),
            region_filter,
            limit,
        }
    }

    /// Length in characters of the normalized text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Identical `(query, region, limit)` triples share a key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.text,
            self.region_filter.as_deref().unwrap_or("*"),
            self.limit
        )
    }

    /// Advanced if the query has whitespace or is at least `advanced_min_length` long.
    pub fn mode(&self, advanced_min_length: usize) -> SearchMode {
        if self.text.contains(char::is_whitespace) || self.len() >= advanced_min_length {
            SearchMode::Advanced
        } else {
            SearchMode::Basic
        }
    }

    /// Distinct whitespace-separated terms of at least `min_len` characters,
    /// in query order, at most `max_terms` of them.
    pub fn terms(&self, min_len: usize, max_terms: usize) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for word in self.text.split_whitespace() {
            if word.chars().count() < min_len || terms.iter().any(|t| t == word) {
                continue;
            }
            terms.push(word.to_string());
            if terms.len() == max_terms {
                break;
            }
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_and_key() {
        let q = SearchQuery::new("  Local 46 ", Some(" WA "), 10);
        assert_eq!(q.text, "local 46");
        assert_eq!(q.region_filter.as_deref(), Some("WA"));
        assert_eq!(q.cache_key(), "local 46|WA|10");

        let lower = SearchQuery::new("Local 46", Some("wa"), 10);
        assert_eq!(lower.region_filter.as_deref(), Some("WA"));
        assert_eq!(lower.cache_key(), q.cache_key());

        let global = SearchQuery::new("local", Some("  "), 5);
        assert_eq!(global.region_filter, None);
        assert_eq!(global.cache_key(), "local|*|5");
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(SearchQuery::new("ibew", None, 1).mode(5), SearchMode::Basic);
        assert_eq!(SearchQuery::new("ibew1", None, 1).mode(5), SearchMode::Advanced);
        assert_eq!(SearchQuery::new("a b", None, 1).mode(5), SearchMode::Advanced);
    }

    #[test]
    fn test_terms() {
        let q = SearchQuery::new("a local local 46 x hall one two three four", None, 1);
        assert_eq!(q.terms(2, 5), vec!["local", "46", "hall", "one", "two"]);
        assert!(SearchQuery::new("a b c", None, 1).terms(2, 5).is_empty());
    }
}
