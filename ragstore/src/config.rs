//! Configuration for the in-memory store and the search orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};

/// Configuration for [`VectorSearch`](crate::VectorSearch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorSearchConfig {
    /// Candidate count at which scoring moves onto the rayon thread pool.
    pub parallel_scoring_threshold: usize,
    /// Number of candidates scored per parallel task; cancellation is checked once per chunk.
    pub scoring_chunk_size: usize,
    /// Timeout applied to searches whose request does not set one.
    pub default_timeout_ms: Option<u64>,
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self { parallel_scoring_threshold: 2048, scoring_chunk_size: 512, default_timeout_ms: None }
    }
}

impl VectorSearchConfig {
    /// Create a new builder for constructing a [`VectorSearchConfig`].
    pub fn builder() -> VectorSearchConfigBuilder {
        VectorSearchConfigBuilder::default()
    }

    /// The default timeout as a [`Duration`].
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Config`] if `scoring_chunk_size == 0` or
    /// `parallel_scoring_threshold == 0`.
    pub fn validate(&self) -> Result<()> {
        if self.scoring_chunk_size == 0 {
            return Err(VectorError::Config(
                "scoring_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.parallel_scoring_threshold == 0 {
            return Err(VectorError::Config(
                "parallel_scoring_threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`VectorSearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct VectorSearchConfigBuilder {
    config: VectorSearchConfig,
}

impl VectorSearchConfigBuilder {
    pub fn parallel_scoring_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_scoring_threshold = threshold;
        self
    }

    pub fn scoring_chunk_size(mut self, size: usize) -> Self {
        self.config.scoring_chunk_size = size;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = Some(timeout.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Build the [`VectorSearchConfig`], validating it.
    pub fn build(self) -> Result<VectorSearchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration for [`InMemoryVectorStore`](crate::InMemoryVectorStore).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Required embedding dimensionality. When `None`, the first stored
    /// document fixes it.
    pub dimensions: Option<usize>,
}

impl StoreConfig {
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// # Errors
    ///
    /// Returns [`VectorError::Config`] if `dimensions` is `Some(0)`.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == Some(0) {
            return Err(VectorError::Config("dimensions must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.config.dimensions = Some(dimensions);
        self
    }

    pub fn build(self) -> Result<StoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = VectorSearchConfig::default();
        assert_eq!(config.parallel_scoring_threshold, 2048);
        assert_eq!(config.scoring_chunk_size, 512);
        assert!(config.default_timeout().is_none());
        assert!(StoreConfig::default().dimensions.is_none());
    }

    #[test]
    fn builder_rejects_zero_sizes() {
        assert!(VectorSearchConfig::builder().scoring_chunk_size(0).build().is_err());
        assert!(VectorSearchConfig::builder().parallel_scoring_threshold(0).build().is_err());
        assert!(StoreConfig::builder().dimensions(0).build().is_err());
    }

    #[test]
    fn builder_sets_timeout() {
        let config = VectorSearchConfig::builder()
            .default_timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(config.default_timeout_ms, Some(250));
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: VectorSearchConfig =
            serde_json::from_str(r#"{"scoring_chunk_size": 64}"#).unwrap();
        assert_eq!(config.scoring_chunk_size, 64);
        assert_eq!(config.parallel_scoring_threshold, 2048);

        let store: StoreConfig = serde_json::from_str(r#"{"dimensions": 384}"#).unwrap();
        assert_eq!(store.dimensions, Some(384));
    }
}
