//! # ragstore
//!
//! Similarity search over embedded documents with a metadata filter language.
//!
//! ## Overview
//!
//! - [`Document`] - text, ordered metadata, and an embedding vector
//! - [`VectorStore`] - the storage seam ([`InMemoryVectorStore`] is the reference backend)
//! - [`FilterExpression`] - a typed boolean predicate over metadata, parsed from
//!   text like `genre == 'drama' && year >= 2020` or built with [`filter::eq`] and friends
//! - [`SearchRequest`] - query vector, `top_k`, similarity threshold, and optional filter
//! - [`VectorSearch`] - the orchestrator: scan, filter, score, threshold, rank
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragstore::{Document, InMemoryVectorStore, SearchRequest, VectorSearch, VectorStore};
//!
//! let store = Arc::new(InMemoryVectorStore::new());
//! store
//!     .add(vec![
//!         Document::with_id("1", "The Kingdom")
//!             .with_metadata("genre", "drama")
//!             .with_metadata("year", 2021)
//!             .with_embedding(vec![0.9, 0.1]),
//!     ])
//!     .await?;
//!
//! let search = VectorSearch::new(store);
//! let request = SearchRequest::new(vec![1.0, 0.0])
//!     .with_top_k(2)
//!     .with_filter_text("genre == 'drama' && year >= 2020")?;
//! for result in search.similarity_search(&request).await? {
//!     println!("{} {:.3}", result.document.id(), result.score);
//! }
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod inmemory;
pub mod request;
pub mod search;
pub mod similarity;
pub mod vectorstore;

pub use config::{StoreConfig, StoreConfigBuilder, VectorSearchConfig, VectorSearchConfigBuilder};
pub use document::{Document, Metadata, MetadataValue, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{Result, VectorError};
pub use filter::{FilterExpression, ParseError};
pub use inmemory::InMemoryVectorStore;
pub use request::{DEFAULT_TOP_K, SIMILARITY_THRESHOLD_ACCEPT_ALL, SearchRequest};
pub use search::{VectorSearch, VectorSearchBuilder};
pub use similarity::cosine_similarity;
pub use vectorstore::{DeleteOutcome, DeleteStatus, DocumentStream, VectorStore};

// Re-exported for callers of `similarity_search_with_cancellation`.
pub use tokio_util::sync::CancellationToken;
