//! # Filtered Search Example
//!
//! Stores documents with precomputed embeddings and metadata, then narrows
//! similarity searches with textual and programmatic filter expressions.
//!
//! Run: `cargo run -p ragstore-demos --example filtered_search`

use std::sync::Arc;

use ragstore::filter::{FilterExpressionConverter, PgJsonbFilterConverter, eq, gte, is_in, not_in};
use ragstore::{
    Document, FilterExpression, InMemoryVectorStore, SearchRequest, SearchResult, VectorSearch,
    VectorStore,
};
use ragstore_telemetry::{TelemetryConfig, init_telemetry};

fn movie(id: &str, genre: &str, year: i64, rating: f64, embedding: [f32; 3]) -> Document {
    Document::with_id(id, format!("{genre} released in {year}"))
        .with_metadata("genre", genre)
        .with_metadata("year", year)
        .with_metadata("rating", rating)
        .with_metadata("streaming", year >= 2020)
        .with_embedding(embedding.to_vec())
}

fn print_results(label: &str, results: &[SearchResult]) {
    println!("\n{label}");
    if results.is_empty() {
        println!("  (no results)");
    }
    for result in results {
        println!(
            "  [score={:.4}] {} | {}",
            result.score,
            result.document.id(),
            result.document.content()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::default())?;

    let store = Arc::new(InMemoryVectorStore::new());
    store
        .add(vec![
            movie("kingdom", "drama", 2021, 8.1, [0.9, 0.1, 0.0]),
            movie("laughs", "comedy", 2022, 6.4, [0.7, 0.3, 0.1]),
            movie("archive", "documentary", 2019, 7.7, [0.2, 0.9, 0.1]),
            movie("harbor", "drama", 2018, 7.2, [0.8, 0.0, 0.4]),
            movie("orbit", "documentary", 2023, 8.6, [0.1, 0.2, 0.9]),
        ])
        .await?;

    let search = VectorSearch::new(store.clone());
    let query = vec![1.0, 0.2, 0.1];

    // -- Textual filter -----------------------------------------------------
    let request = SearchRequest::new(query.clone())
        .with_top_k(3)
        .with_filter_text("genre == 'drama' && year >= 2020")?;
    print_results("genre == 'drama' && year >= 2020", &search.similarity_search(&request).await?);

    // -- Programmatic filter, shown in its textual and SQL forms -------------
    let filter = is_in("genre", ["drama", "documentary"]).and(gte("rating", 7.5));
    println!("\nfilter text: {filter}");
    println!("pg where:    {}", PgJsonbFilterConverter::default().convert(&filter));
    let request = SearchRequest::new(query.clone()).with_top_k(5).with_filter(filter);
    let results = search.similarity_search(&request).await?;
    print_results("high-rated dramas and documentaries", &results);

    // -- Negation and exclusion ---------------------------------------------
    let filter = !eq("streaming", true) | not_in("genre", ["drama", "comedy"]);
    let request = SearchRequest::new(query.clone()).with_top_k(5).with_filter(filter.clone());
    print_results(&filter.to_string(), &search.similarity_search(&request).await?);

    // -- Malformed filters report the offending position ---------------------
    if let Err(e) = FilterExpression::parse("year >= 2020 &&") {
        println!("\nparse error: {e}");
    }

    // -- Delete by filter, then search again ----------------------------------
    let outcome = store.delete_by_filter(&FilterExpression::parse("year < 2020")?).await?;
    let remaining = store.len().await?;
    tracing::info!(
        removed = outcome.removed,
        remaining,
        status = ?outcome.status(),
        "deleted pre-2020 titles"
    );
    let request = SearchRequest::new(query).with_top_k(5).with_similarity_threshold(0.5);
    let results = search.similarity_search(&request).await?;
    print_results("after deleting pre-2020 titles, score >= 0.5", &results);

    Ok(())
}
