//! Data types for documents, metadata values, and search results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered metadata map attached to a [`Document`]. Key insertion order is preserved.
pub type Metadata = IndexMap<String, MetadataValue>;

/// A scalar metadata value.
///
/// Serialized untagged, so `{"year": 2021, "genre": "drama"}` reads directly
/// into a [`Metadata`] map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// String value.
    String(String),
}

impl MetadataValue {
    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Boolean(b)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        MetadataValue::Integer(i64::from(i))
    }
}

impl From<u32> for MetadataValue {
    fn from(i: u32) -> Self {
        MetadataValue::Integer(i64::from(i))
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<f32> for MetadataValue {
    fn from(f: f32) -> Self {
        MetadataValue::Float(f64::from(f))
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

/// A stored unit of retrievable content: text, metadata, and its embedding.
///
/// The `id` and `content` are fixed at construction. Metadata and the
/// embedding are attached with the consuming `with_*` methods before the
/// document is handed to a [`VectorStore`](crate::VectorStore); once stored,
/// a document is never modified in place.
///
/// # Example
///
/// ```rust
/// use ragstore::Document;
///
/// let doc = Document::with_id("1", "A family drama set in Sofia")
///     .with_metadata("genre", "drama")
///     .with_metadata("year", 2021)
///     .with_embedding(vec![0.1, 0.9]);
/// assert_eq!(doc.dimensions(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    content: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    embedding: Vec<f32>,
}

impl Document {
    /// Create a document with a freshly generated UUID v4 identifier.
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), content)
    }

    /// Create a document with a caller-supplied identifier.
    pub fn with_id(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: Vec::new(),
        }
    }

    /// Return this document with `key` set to `value`.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Return this document with its metadata replaced by `metadata`.
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Return this document with the given embedding attached.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Whether an embedding has been attached.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    /// Dimensionality of the attached embedding (0 if none).
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// A retrieved [`Document`] paired with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved document.
    pub document: Document,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = Document::new("same text");
        let b = Document::new("same text");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.content(), b.content());
    }

    #[test]
    fn metadata_keeps_insertion_order() {
        let doc = Document::with_id("d", "x")
            .with_metadata("zeta", 1)
            .with_metadata("alpha", "a")
            .with_metadata("mid", true);
        let keys: Vec<&str> = doc.metadata().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn metadata_deserializes_untagged() {
        let json = r#"{"id":"1","content":"c",
            "metadata":{"year":2021,"rating":4.5,"genre":"drama","new":true}}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.metadata()["year"], MetadataValue::Integer(2021));
        assert_eq!(doc.metadata()["rating"], MetadataValue::Float(4.5));
        assert_eq!(doc.metadata()["genre"], MetadataValue::String("drama".into()));
        assert_eq!(doc.metadata()["new"], MetadataValue::Boolean(true));
        assert!(!doc.has_embedding());
    }

    #[test]
    fn scalar_views_match_only_their_variant() {
        let genre = MetadataValue::from("drama");
        assert_eq!(genre.as_str(), Some("drama"));
        assert_eq!(genre.as_bool(), None);
        assert_eq!(genre.as_f64(), None);

        let streaming = MetadataValue::from(true);
        assert_eq!(streaming.as_bool(), Some(true));
        assert_eq!(streaming.as_str(), None);

        assert_eq!(MetadataValue::from(2021).as_f64(), Some(2021.0));
        assert_eq!(MetadataValue::from(7.5).as_f64(), Some(7.5));
    }

    #[test]
    fn metadata_map_replaces_existing_entries() {
        let metadata: Metadata =
            [("country".to_string(), MetadataValue::from("BG"))].into_iter().collect();
        let doc = Document::with_id("d", "x")
            .with_metadata("stale", 1)
            .with_metadata_map(metadata.clone())
            .with_metadata("year", 2020);
        let keys: Vec<&str> = doc.metadata().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["country", "year"]);
        assert_eq!(doc.metadata()["country"], metadata["country"]);
    }
}
