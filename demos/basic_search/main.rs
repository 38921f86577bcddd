//! # Basic Search Example
//!
//! Ingests a handful of documents through a deterministic
//! `MockEmbeddingProvider`, then runs text queries against an
//! `InMemoryVectorStore`. Needs no API keys.
//!
//! Run: `cargo run -p ragstore-demos --example basic_search`

use std::sync::Arc;

use ragstore::{
    Document, EmbeddingProvider, InMemoryVectorStore, SearchRequest, VectorSearch,
    VectorSearchConfig, VectorStore,
};
use ragstore_telemetry::{TelemetryConfig, init_telemetry};

// ---------------------------------------------------------------------------
// MockEmbeddingProvider: hashed word buckets, so shared words raise similarity
// ---------------------------------------------------------------------------

struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> ragstore::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig {
        log_level: "ragstore=debug,info".into(),
        ..Default::default()
    })?;

    // -- 1. Build the orchestrator -----------------------------------------
    let search = VectorSearch::builder()
        .config(VectorSearchConfig::default())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(64)))
        .build()?;

    // -- 2. Ingest: documents without embeddings are embedded on the way in
    let documents = vec![
        Document::with_id(
            "rust",
            "Rust is a systems programming language focused on memory safety and speed.",
        )
        .with_metadata("topic", "rust"),
        Document::with_id(
            "python",
            "Python is an interpreted programming language popular in data science.",
        )
        .with_metadata("topic", "python"),
        Document::with_id(
            "rag",
            "Retrieval augmented generation stores embedded documents in a vector database.",
        )
        .with_metadata("topic", "rag"),
    ];
    println!("Ingesting {} documents...", documents.len());
    search.ingest(documents).await?;
    tracing::info!(store = search.vector_store().name(), "ingestion finished");

    // -- 3. Query ------------------------------------------------------------
    let template = SearchRequest::default().with_top_k(2);
    for query in ["memory safety", "data science language", "vector database"] {
        println!("\nQuery: \"{query}\"");
        let results = search.search_text(query, template.clone()).await?;
        if results.is_empty() {
            println!("  (no results)");
        }
        for (i, result) in results.iter().enumerate() {
            println!(
                "  {}. [score={:.4}] {} | {}",
                i + 1,
                result.score,
                result.document.id(),
                result.document.content(),
            );
        }
    }

    println!("\nDone.");
    Ok(())
}
