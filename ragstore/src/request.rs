//! Similarity search request descriptor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};
use crate::filter::{FilterExpression, ParseError};

/// Number of results returned when a request does not set `top_k`.
pub const DEFAULT_TOP_K: usize = 4;

/// Threshold that keeps every candidate with a non-negative score.
pub const SIMILARITY_THRESHOLD_ACCEPT_ALL: f32 = 0.0;

/// A similarity search request.
///
/// Built incrementally: every `with_*` method consumes the request and
/// returns a new one. Invariants (`top_k >= 1`, threshold in `[0, 1]`) are
/// checked by [`validate`](SearchRequest::validate), which the orchestrator
/// runs before touching the store.
///
/// # Example
///
/// ```rust
/// use ragstore::SearchRequest;
///
/// let request = SearchRequest::new(vec![0.1, 0.7, 0.2])
///     .with_top_k(5)
///     .with_similarity_threshold(0.5)
///     .with_filter_text("genre == 'drama' && year >= 2020")
///     .unwrap();
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    query_vector: Vec<f32>,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    similarity_threshold: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<FilterExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<Duration>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// An empty query vector with default options, useful as a template for
/// [`VectorSearch::search_text`](crate::VectorSearch::search_text).
impl Default for SearchRequest {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl SearchRequest {
    pub fn new(query_vector: Vec<f32>) -> Self {
        Self {
            query_vector,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: SIMILARITY_THRESHOLD_ACCEPT_ALL,
            filter: None,
            timeout: None,
        }
    }

    pub fn with_query_vector(mut self, query_vector: Vec<f32>) -> Self {
        self.query_vector = query_vector;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Reset the threshold to [`SIMILARITY_THRESHOLD_ACCEPT_ALL`].
    pub fn with_similarity_threshold_all(self) -> Self {
        self.with_similarity_threshold(SIMILARITY_THRESHOLD_ACCEPT_ALL)
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Parse `text` and use it as the metadata filter.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] if the text is malformed.
    pub fn with_filter_text(self, text: &str) -> std::result::Result<Self, ParseError> {
        Ok(self.with_filter(FilterExpression::parse(text)?))
    }

    pub fn without_filter(mut self) -> Self {
        self.filter = None;
        self
    }

    /// Abort the search with [`VectorError::Cancelled`] if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn query_vector(&self) -> &[f32] {
        &self.query_vector
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    pub fn filter(&self) -> Option<&FilterExpression> {
        self.filter.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Check the request invariants.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidRequest`] if:
    /// - `top_k == 0`
    /// - `similarity_threshold` is outside `[0, 1]` or NaN
    /// - the query vector is empty or contains non-finite values
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(VectorError::InvalidRequest("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(VectorError::InvalidRequest(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.query_vector.is_empty() {
            return Err(VectorError::InvalidRequest("query vector is empty".to_string()));
        }
        if self.query_vector.iter().any(|x| !x.is_finite()) {
            return Err(VectorError::InvalidRequest(
                "query vector contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::eq;

    #[test]
    fn defaults() {
        let request = SearchRequest::new(vec![1.0]);
        assert_eq!(request.top_k(), 4);
        assert_eq!(request.similarity_threshold(), 0.0);
        assert!(request.filter().is_none());
        assert!(request.timeout().is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn zero_top_k_is_invalid() {
        let err = SearchRequest::new(vec![1.0]).with_top_k(0).validate().unwrap_err();
        assert!(matches!(err, VectorError::InvalidRequest(_)));
    }

    #[test]
    fn threshold_bounds() {
        for bad in [-0.1, 1.01, f32::NAN] {
            let request = SearchRequest::new(vec![1.0]).with_similarity_threshold(bad);
            let err = request.validate().unwrap_err();
            assert!(matches!(err, VectorError::InvalidRequest(_)), "threshold {bad}");
        }
        for good in [0.0, 0.5, 1.0] {
            let request = SearchRequest::new(vec![1.0]).with_similarity_threshold(good);
            assert!(request.validate().is_ok());
        }
        let reset = SearchRequest::new(vec![1.0])
            .with_similarity_threshold(0.9)
            .with_similarity_threshold_all();
        assert_eq!(reset.similarity_threshold(), SIMILARITY_THRESHOLD_ACCEPT_ALL);
    }

    #[test]
    fn query_vector_must_be_usable() {
        assert!(SearchRequest::default().validate().is_err());
        assert!(SearchRequest::new(vec![1.0, f32::INFINITY]).validate().is_err());
    }

    #[test]
    fn filter_text_is_parsed_eagerly() {
        let request = SearchRequest::new(vec![1.0]).with_filter_text("country == 'BG'").unwrap();
        assert_eq!(request.filter(), Some(&eq("country", "BG")));
        assert!(SearchRequest::new(vec![1.0]).with_filter_text("country = 'BG'").is_err());
        assert!(request.without_filter().filter().is_none());
    }

    #[test]
    fn each_step_returns_new_value() {
        let base = SearchRequest::new(vec![1.0, 0.0]);
        let narrowed = base.clone().with_top_k(1);
        assert_eq!(base.top_k(), 4);
        assert_eq!(narrowed.top_k(), 1);
    }
}
