//! Similarity search orchestrator.
//!
//! [`VectorSearch`] answers a [`SearchRequest`] by composing a
//! [`VectorStore`] scan, the request's metadata filter, cosine scoring, the
//! similarity threshold, and top-K ranking. An optional
//! [`EmbeddingProvider`] adds text queries and embedding at ingestion.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragstore::{InMemoryVectorStore, SearchRequest, VectorSearch};
//!
//! let search = VectorSearch::builder()
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! search.ingest(documents).await?;
//! let results = search
//!     .search_text("family drama", SearchRequest::default().with_filter_text("year >= 2020")?)
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::VectorSearchConfig;
use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, VectorError};
use crate::request::SearchRequest;
use crate::similarity::{cosine_similarity, rank_by_score};
use crate::vectorstore::VectorStore;

/// How many scanned documents pass between synchronous cancellation checks.
const SCAN_CHECK_INTERVAL: usize = 256;

/// Cooperative cancellation state for one search call.
#[derive(Clone)]
struct Deadline {
    token: CancellationToken,
    at: Option<Instant>,
}

impl Deadline {
    /// A timeout too large to represent as an instant means no deadline.
    fn new(token: &CancellationToken, timeout: Option<Duration>) -> Self {
        Self { token: token.clone(), at: timeout.and_then(|t| Instant::now().checked_add(t)) }
    }

    fn is_expired(&self) -> bool {
        self.token.is_cancelled() || self.at.is_some_and(|at| Instant::now() >= at)
    }

    fn check(&self) -> Result<()> {
        if self.is_expired() { Err(VectorError::Cancelled) } else { Ok(()) }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    async fn expired(&self) {
        match self.at {
            Some(at) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(tokio::time::Instant::from_std(at)) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

fn score_chunk(chunk: &[Arc<Document>], query: &[f32]) -> Result<Vec<f32>> {
    chunk.iter().map(|document| cosine_similarity(query, document.embedding())).collect()
}

fn score_sequential(
    candidates: &[Arc<Document>],
    query: &[f32],
    chunk_size: usize,
    deadline: &Deadline,
) -> Result<Vec<f32>> {
    let mut scores = Vec::with_capacity(candidates.len());
    for chunk in candidates.chunks(chunk_size) {
        deadline.check()?;
        scores.extend(score_chunk(chunk, query)?);
    }
    Ok(scores)
}

fn score_parallel(
    candidates: &[Arc<Document>],
    query: &[f32],
    chunk_size: usize,
    deadline: &Deadline,
) -> Result<Vec<f32>> {
    let per_chunk: Vec<Vec<f32>> = candidates
        .par_chunks(chunk_size)
        .map(|chunk| {
            deadline.check()?;
            score_chunk(chunk, query)
        })
        .collect::<Result<_>>()?;
    Ok(per_chunk.into_iter().flatten().collect())
}

/// The search orchestrator.
///
/// Stateless per call and read-only: every search works on the snapshot the
/// store's `scan()` produced when the search started. Construct one via
/// [`VectorSearch::builder()`] or [`VectorSearch::new`].
pub struct VectorSearch {
    config: VectorSearchConfig,
    vector_store: Arc<dyn VectorStore>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl VectorSearch {
    /// Create an orchestrator over `vector_store` with default configuration
    /// and no embedding provider.
    pub fn new(vector_store: Arc<dyn VectorStore>) -> Self {
        Self { config: VectorSearchConfig::default(), vector_store, embedding_provider: None }
    }

    /// Create a new [`VectorSearchBuilder`].
    pub fn builder() -> VectorSearchBuilder {
        VectorSearchBuilder::default()
    }

    pub fn config(&self) -> &VectorSearchConfig {
        &self.config
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    pub fn embedding_provider(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.embedding_provider.as_ref()
    }

    /// Run a similarity search.
    ///
    /// Returns at most `top_k` results in descending score order; every
    /// score is at least the request's similarity threshold.
    ///
    /// # Errors
    ///
    /// - [`VectorError::InvalidRequest`] if the request fails validation
    /// - [`VectorError::DimensionMismatch`] if a stored embedding's length
    ///   differs from the query's
    /// - [`VectorError::Cancelled`] if the request timeout elapses
    /// - any error the store's scan reports
    pub async fn similarity_search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        self.similarity_search_with_cancellation(request, &CancellationToken::new()).await
    }

    /// Run a similarity search that aborts with [`VectorError::Cancelled`]
    /// when `cancel` fires or the request timeout elapses.
    ///
    /// Cancellation never yields partial results.
    pub async fn similarity_search_with_cancellation(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        // 1. Validate
        if let Err(e) = request.validate() {
            warn!(error = %e, "rejected search request");
            return Err(e);
        }

        let deadline = Deadline::new(cancel, request.timeout().or(self.config.default_timeout()));
        let store = self.vector_store.name();

        let outcome = tokio::select! {
            biased;
            _ = deadline.expired() => Err(VectorError::Cancelled),
            result = self.execute(request, &deadline) => result,
        };

        match outcome {
            Ok(results) => Ok(results),
            Err(VectorError::Cancelled) => {
                warn!(store, "similarity search cancelled");
                Err(VectorError::Cancelled)
            }
            Err(e) => {
                error!(store, error = %e, "similarity search failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        deadline: &Deadline,
    ) -> Result<Vec<SearchResult>> {
        deadline.check()?;

        // 2. Snapshot the store, 3. applying the filter as documents arrive
        let filter = request.filter();
        if let Some(filter) = filter {
            debug!(filter = %filter, "applying metadata filter");
        }
        let mut stream = self.vector_store.scan().await?;
        let mut candidates: Vec<Arc<Document>> = Vec::new();
        let mut scanned = 0usize;
        while let Some(document) = stream.next().await {
            let document = document?;
            scanned += 1;
            if scanned % SCAN_CHECK_INTERVAL == 0 {
                deadline.check()?;
            }
            if filter.is_none_or(|f| f.evaluate(document.metadata())) {
                candidates.push(document);
            }
        }
        drop(stream);
        deadline.check()?;

        // 4. Score every candidate
        let candidate_count = candidates.len();
        let chunk_size = self.config.scoring_chunk_size.max(1);
        let scores = if candidate_count >= self.config.parallel_scoring_threshold {
            debug!(candidate_count, chunk_size, "scoring candidates in parallel");
            let query = request.query_vector().to_vec();
            let deadline = deadline.clone();
            let (candidates_back, scores) = tokio::task::spawn_blocking(move || {
                let scores = score_parallel(&candidates, &query, chunk_size, &deadline);
                (candidates, scores)
            })
            .await
            .map_err(|e| {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                VectorError::Cancelled
            })?;
            candidates = candidates_back;
            scores?
        } else {
            score_sequential(&candidates, request.query_vector(), chunk_size, deadline)?
        };

        // 5. Drop candidates below the threshold, 6. rank and truncate
        let threshold = request.similarity_threshold();
        let mut ranked: Vec<(Arc<Document>, f32)> =
            candidates.into_iter().zip(scores).filter(|(_, score)| *score >= threshold).collect();
        rank_by_score(&mut ranked, |(_, score)| *score);
        ranked.truncate(request.top_k());

        // 7. Materialise in rank order
        let results: Vec<SearchResult> = ranked
            .into_iter()
            .map(|(document, score)| SearchResult { document: Document::clone(&document), score })
            .collect();

        info!(
            store = self.vector_store.name(),
            scanned,
            candidate_count,
            result_count = results.len(),
            top_k = request.top_k(),
            filtered = filter.is_some(),
            "similarity search completed"
        );

        Ok(results)
    }

    fn require_provider(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.embedding_provider.as_ref().ok_or_else(|| {
            VectorError::Config("an embedding provider is required for this operation".to_string())
        })
    }

    /// Embed `query` and run a similarity search with the options of `template`.
    ///
    /// The template's query vector is replaced by the embedding; use
    /// `SearchRequest::default()` as a starting point.
    ///
    /// # Errors
    ///
    /// Embedding failures are returned unchanged; otherwise as
    /// [`similarity_search`](VectorSearch::similarity_search). Returns
    /// [`VectorError::Config`] if no embedding provider is configured.
    pub async fn search_text(
        &self,
        query: &str,
        template: SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        let provider = self.require_provider()?;
        let query_vector = provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;
        self.similarity_search(&template.with_query_vector(query_vector)).await
    }

    /// Embed every document that has no embedding yet, then add all of them
    /// to the store.
    ///
    /// Nothing is stored if embedding fails.
    ///
    /// # Errors
    ///
    /// Embedding failures are returned unchanged. Returns
    /// [`VectorError::Config`] if some document lacks an embedding and no
    /// provider is configured, and
    /// [`VectorError::EmbeddingUnavailable`] if the provider returns the
    /// wrong number of embeddings.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<()> {
        let pending: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.has_embedding())
            .map(|(i, _)| i)
            .collect();

        let documents = if pending.is_empty() {
            documents
        } else {
            let provider = self.require_provider()?;
            let texts: Vec<&str> = pending.iter().map(|&i| documents[i].content()).collect();
            let embeddings = provider.embed_batch(&texts).await.inspect_err(|e| {
                error!(error = %e, count = texts.len(), "embedding failed during ingestion");
            })?;
            if embeddings.len() != pending.len() {
                return Err(VectorError::EmbeddingUnavailable {
                    provider: provider.name().to_string(),
                    message: format!(
                        "returned {} embeddings for {} inputs",
                        embeddings.len(),
                        pending.len()
                    ),
                });
            }

            let mut documents: Vec<Option<Document>> = documents.into_iter().map(Some).collect();
            for (&i, embedding) in pending.iter().zip(embeddings) {
                documents[i] = documents[i].take().map(|d| d.with_embedding(embedding));
            }
            documents.into_iter().flatten().collect()
        };

        let count = documents.len();
        self.vector_store.add(documents).await.inspect_err(|e| {
            error!(store = self.vector_store.name(), error = %e, "add failed during ingestion");
        })?;
        info!(
            store = self.vector_store.name(),
            count,
            embedded = pending.len(),
            "ingested documents"
        );
        Ok(())
    }
}

/// Builder for constructing a [`VectorSearch`].
///
/// The vector store is required; configuration defaults to
/// [`VectorSearchConfig::default()`] and the embedding provider is optional.
#[derive(Default)]
pub struct VectorSearchBuilder {
    config: Option<VectorSearchConfig>,
    vector_store: Option<Arc<dyn VectorStore>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl VectorSearchBuilder {
    pub fn config(mut self, config: VectorSearchConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Build the [`VectorSearch`].
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Config`] if the vector store is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<VectorSearch> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| VectorError::Config("vector_store is required".to_string()))?;
        Ok(VectorSearch { config, vector_store, embedding_provider: self.embedding_provider })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryVectorStore;

    #[test]
    fn builder_requires_store() {
        let err = VectorSearch::builder().build().err().unwrap();
        assert!(matches!(err, VectorError::Config(_)));
    }

    #[test]
    fn builder_validates_config() {
        let config = VectorSearchConfig { scoring_chunk_size: 0, ..Default::default() };
        let err = VectorSearch::builder()
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .config(config)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, VectorError::Config(_)));
    }

    #[test]
    fn parallel_and_sequential_scores_agree() {
        let candidates: Vec<Arc<Document>> = (0..100)
            .map(|i| {
                let x = i as f32;
                let embedding = vec![x.sin(), x.cos(), 1.0];
                Arc::new(Document::with_id(i.to_string(), "").with_embedding(embedding))
            })
            .collect();
        let deadline = Deadline::new(&CancellationToken::new(), None);
        let query = [0.3, -0.2, 0.9];
        let sequential = score_sequential(&candidates, &query, 7, &deadline).unwrap();
        let parallel = score_parallel(&candidates, &query, 7, &deadline).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn cancelled_token_stops_scoring() {
        let candidates = vec![Arc::new(Document::with_id("a", "").with_embedding(vec![1.0]))];
        let token = CancellationToken::new();
        token.cancel();
        let deadline = Deadline::new(&token, None);
        assert!(matches!(
            score_parallel(&candidates, &[1.0], 1, &deadline),
            Err(VectorError::Cancelled)
        ));
        assert!(matches!(
            score_sequential(&candidates, &[1.0], 1, &deadline),
            Err(VectorError::Cancelled)
        ));
    }
}
