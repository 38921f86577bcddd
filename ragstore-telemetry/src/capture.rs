//! In-memory event capture for asserting on log output in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One recorded `tracing` event.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, serde_json::Value>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}

/// Shared buffer of captured events.
///
/// Cloning is cheap; all clones see the same buffer.
///
/// ```rust
/// use ragstore_telemetry::CapturedEvents;
///
/// let events = CapturedEvents::new();
/// tracing::subscriber::with_default(events.subscriber(), || {
///     tracing::info!(count = 3, "added documents");
/// });
/// let event = events.find("added documents").unwrap();
/// assert_eq!(event.field("count"), Some(&serde_json::json!(3)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapturedEvents {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A layer that appends to this buffer.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer { events: self.clone() }
    }

    /// A registry with only the capture layer, for `tracing::subscriber::with_default`.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(self.layer())
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.lock().clone()
    }

    /// The first event whose message equals `message`.
    pub fn find(&self, message: &str) -> Option<CapturedEvent> {
        self.lock().iter().find(|e| e.message == message).cloned()
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.lock().iter().filter(|e| e.level == level).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A `tracing_subscriber` layer recording every event it sees into a [`CapturedEvents`].
#[derive(Debug, Clone)]
pub struct CaptureLayer {
    events: CapturedEvents,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        self.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: HashMap<String, serde_json::Value>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.insert(field, serde_json::Value::String(text));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_level_message_and_fields() {
        let events = CapturedEvents::new();
        tracing::subscriber::with_default(events.subscriber(), || {
            tracing::debug!(backend = "in_memory", count = 2usize, "added documents");
            tracing::warn!(error = %"top_k must be greater than zero", "rejected search request");
        });

        assert_eq!(events.len(), 2);
        let messages: Vec<String> = events.events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["added documents", "rejected search request"]);
        let added = events.find("added documents").unwrap();
        assert_eq!(added.level, Level::DEBUG);
        assert_eq!(added.field("backend"), Some(&serde_json::json!("in_memory")));
        assert_eq!(added.field("count"), Some(&serde_json::json!(2)));
        assert!(added.target.ends_with("capture::tests"));

        let warnings = events.at_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].field("error"),
            Some(&serde_json::json!("top_k must be greater than zero"))
        );
    }

    #[test]
    fn clones_share_the_buffer() {
        let events = CapturedEvents::new();
        let other = events.clone();
        tracing::subscriber::with_default(other.subscriber(), || tracing::info!("hello"));
        assert_eq!(events.find("hello").map(|e| e.level), Some(Level::INFO));
        events.clear();
        assert!(other.is_empty());
    }
}
