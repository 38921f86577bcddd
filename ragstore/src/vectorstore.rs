//! Vector store trait: the capability every storage backend implements.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;
use crate::filter::FilterExpression;

/// A finite stream of stored documents, produced by [`VectorStore::scan`].
pub type DocumentStream = BoxStream<'static, Result<Arc<Document>>>;

/// How much of a delete request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    /// Every requested ID was found and removed (also the case for an empty request).
    AllRemoved,
    /// Some requested IDs were removed, others were not present.
    PartiallyRemoved,
    /// None of the requested IDs were present.
    NoneFound,
}

/// Result of a delete call.
///
/// Missing IDs are not an error; the counts report what actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Number of distinct IDs requested.
    pub requested: usize,
    /// Number of documents removed.
    pub removed: usize,
}

impl DeleteOutcome {
    pub fn new(requested: usize, removed: usize) -> Self {
        Self { requested, removed }
    }

    pub fn status(&self) -> DeleteStatus {
        if self.removed == self.requested {
            DeleteStatus::AllRemoved
        } else if self.removed == 0 {
            DeleteStatus::NoneFound
        } else {
            DeleteStatus::PartiallyRemoved
        }
    }

    /// Whether every requested ID was removed.
    pub fn is_complete(&self) -> bool {
        self.status() == DeleteStatus::AllRemoved
    }
}

/// A storage backend for documents with vector embeddings.
///
/// Implementations own the authoritative copy of each [`Document`]. The
/// search orchestrator ([`VectorSearch`](crate::VectorSearch)) only reads
/// through [`scan`](VectorStore::scan), so a backend needs nothing beyond
/// these operations to support filtered similarity search.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::{Document, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(vec![Document::with_id("1", "hello").with_embedding(vec![1.0, 0.0])]).await?;
/// let outcome = store.delete(&["1", "missing"]).await?;
/// assert_eq!(outcome.removed, 1);
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name used in logs and error messages.
    fn name(&self) -> &str;

    /// Insert or replace (by ID) each document. Documents must have embeddings set.
    ///
    /// Readers observe either the old or the new version of each individual
    /// document, never a partial one.
    async fn add(&self, documents: Vec<Document>) -> Result<()>;

    /// Delete documents by ID. Duplicate IDs in one call count once.
    async fn delete(&self, ids: &[&str]) -> Result<DeleteOutcome>;

    /// Stream every stored document, reflecting state at the start of the scan.
    ///
    /// Each call yields a fresh stream.
    async fn scan(&self) -> Result<DocumentStream>;

    /// Delete every document whose metadata satisfies `filter`.
    ///
    /// The default implementation scans, evaluates, then deletes the matching
    /// IDs. Backends able to do this in one pass should override it.
    async fn delete_by_filter(&self, filter: &FilterExpression) -> Result<DeleteOutcome> {
        let mut stream = self.scan().await?;
        let mut ids = Vec::new();
        while let Some(document) = stream.next().await {
            let document = document?;
            if filter.evaluate(document.metadata()) {
                ids.push(document.id().to_string());
            }
        }
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.delete(&refs).await
    }

    /// Number of stored documents.
    async fn len(&self) -> Result<usize> {
        let mut stream = self.scan().await?;
        let mut count = 0;
        while let Some(document) = stream.next().await {
            document?;
            count += 1;
        }
        Ok(count)
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_status_from_counts() {
        assert_eq!(DeleteOutcome::new(0, 0).status(), DeleteStatus::AllRemoved);
        assert_eq!(DeleteOutcome::new(3, 3).status(), DeleteStatus::AllRemoved);
        assert_eq!(DeleteOutcome::new(3, 1).status(), DeleteStatus::PartiallyRemoved);
        assert_eq!(DeleteOutcome::new(1, 0).status(), DeleteStatus::NoneFound);
        assert!(!DeleteOutcome::new(1, 0).is_complete());
    }
}
