//! In-memory vector store.
//!
//! This module provides [`InMemoryVectorStore`], the reference backend: an
//! insertion-ordered map of documents protected by a `tokio::sync::RwLock`.
//! It is suitable for development, testing, and small-scale use cases.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::StoreConfig;
use crate::document::Document;
use crate::error::{Result, VectorError};
use crate::filter::FilterExpression;
use crate::vectorstore::{DeleteOutcome, DocumentStream, VectorStore};

const BACKEND: &str = "in_memory";

#[derive(Debug, Default)]
struct Inner {
    /// Fixed by configuration or by the first successful insert.
    dimensions: Option<usize>,
    documents: IndexMap<String, Arc<Document>>,
}

/// An in-memory [`VectorStore`].
///
/// Scan order is insertion order of IDs; replacing a document keeps its
/// original position. Writers hold the lock only while mutating the map, and
/// scans hold the read lock only while cloning the document handles, so a
/// search never blocks writers while it scores.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::{InMemoryVectorStore, StoreConfig};
///
/// let store = InMemoryVectorStore::with_config(StoreConfig::builder().dimensions(384).build()?)?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty store whose dimensionality is fixed by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store from a validated configuration.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: RwLock::new(Inner { dimensions: config.dimensions, documents: IndexMap::new() }),
        })
    }

    /// The embedding dimensionality this store enforces, once known.
    pub async fn dimensions(&self) -> Option<usize> {
        self.inner.read().await.dimensions
    }
}

/// Check a document before it is stored, returning its dimensionality.
fn validate_document(document: &Document) -> Result<usize> {
    if !document.has_embedding() {
        return Err(VectorError::InvalidDocument {
            id: document.id().to_string(),
            reason: "embedding is missing".to_string(),
        });
    }
    if document.embedding().iter().any(|x| !x.is_finite()) {
        return Err(VectorError::InvalidDocument {
            id: document.id().to_string(),
            reason: "embedding contains non-finite values".to_string(),
        });
    }
    Ok(document.dimensions())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn add(&self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;

        // Validate the whole batch before touching the map.
        let mut dimensions = inner.dimensions;
        for document in &documents {
            let actual = validate_document(document)?;
            match dimensions {
                Some(expected) if expected != actual => {
                    return Err(VectorError::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
                None => dimensions = Some(actual),
            }
        }

        let count = documents.len();
        inner.dimensions = dimensions;
        for document in documents {
            inner.documents.insert(document.id().to_string(), Arc::new(document));
        }

        debug!(backend = BACKEND, count, total = inner.documents.len(), "added documents");
        Ok(())
    }

    async fn delete(&self, ids: &[&str]) -> Result<DeleteOutcome> {
        let unique: Vec<&str> = {
            let mut seen = HashSet::new();
            ids.iter().copied().filter(|id| seen.insert(*id)).collect()
        };
        if unique.is_empty() {
            return Ok(DeleteOutcome::new(0, 0));
        }

        let mut inner = self.inner.write().await;
        let removed =
            unique.iter().filter(|id| inner.documents.shift_remove(**id).is_some()).count();

        let outcome = DeleteOutcome::new(unique.len(), removed);
        debug!(
            backend = BACKEND,
            requested = outcome.requested,
            removed = outcome.removed,
            status = ?outcome.status(),
            "deleted documents"
        );
        Ok(outcome)
    }

    async fn scan(&self) -> Result<DocumentStream> {
        let snapshot: Vec<Arc<Document>> = {
            let inner = self.inner.read().await;
            inner.documents.values().cloned().collect()
        };
        Ok(futures::stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn delete_by_filter(&self, filter: &FilterExpression) -> Result<DeleteOutcome> {
        let mut inner = self.inner.write().await;
        let before = inner.documents.len();
        inner.documents.retain(|_, document| !filter.evaluate(document.metadata()));
        let removed = before - inner.documents.len();

        debug!(backend = BACKEND, removed, filter = %filter, "deleted documents by filter");
        Ok(DeleteOutcome::new(removed, removed))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.documents.len())
    }
}
