//! Syntactic query checks that run before any network I/O.

use regex::Regex;

use crate::config::DEFAULT_MAX_QUERY_LENGTH;
use crate::errors::SearchError;

/// Constraints a source places on its queries.
#[derive(Debug, Clone)]
pub struct QueryRules {
    /// Longest accepted query, in characters
    pub max_length: usize,
    /// Whole-query pattern for sources with strict syntax (e.g. id-only)
    pub pattern: Option<Regex>,
}

impl Default for QueryRules {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_QUERY_LENGTH,
            pattern: None,
        }
    }
}

impl QueryRules {
    /// Free-text rules with the given length ceiling.
    pub fn free_text(max_length: usize) -> Self {
        Self {
            max_length,
            pattern: None,
        }
    }

    /// Require every query to match `pattern`.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Tighten the length ceiling; never loosens it.
    pub fn capped_at(mut self, max_length: usize) -> Self {
        self.max_length = self.max_length.min(max_length);
        self
    }

    /// Check a query aimed at `source_key` against these rules.
    ///
    /// # Errors
    /// - `SearchError::InvalidQuery` - Query is empty, too long, or does not
    ///   match the required pattern
    pub fn validate(&self, source_key: &str, query: &str) -> Result<(), SearchError> {
        self.check(query).map_err(|reason| SearchError::InvalidQuery {
            source_key: source_key.to_string(),
            reason,
        })
    }

    fn check(&self, query: &str) -> Result<(), String> {
        if query.trim().is_empty() {
            return Err("query is empty".to_string());
        }

        let length = query.chars().count();
        if length > self.max_length {
            return Err(format!(
                "query is {length} characters long, maximum is {}",
                self.max_length
            ));
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(query) {
                return Err(format!("query does not match pattern {}", pattern.as_str()));
            }
        }

        Ok(())
    }
}
