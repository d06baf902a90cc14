use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a trace (16 bytes, OTLP wire width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId([u8; 16]);

/// Unique identifier for a span within a trace (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId([u8; 8]);

impl TraceId {
    /// Creates a trace ID from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        TraceId(bytes)
    }

    /// Returns true for the all-zero trace ID, which marks a span with no
    /// recorded trace context (e.g. synthetic spans).
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Returns the lowercase hex representation.
    pub fn hex_string(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex_string())
    }
}

impl SpanId {
    /// Creates a span ID from raw bytes.
    pub const fn new(bytes: [u8; 8]) -> Self {
        SpanId(bytes)
    }

    /// Returns true for the all-zero span ID.
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 8]
    }

    /// Returns the lowercase hex representation.
    pub fn hex_string(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex_string())
    }
}

/// Role of a span relative to its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    /// Kind was not set by the instrumentation.
    #[default]
    Unspecified,
    /// Internal operation within an application.
    Internal,
    /// Server-side handling of a remote request.
    Server,
    /// Client-side of a remote call.
    Client,
    /// Initiator of an asynchronous message.
    Producer,
    /// Handler of an asynchronous message.
    Consumer,
}

impl SpanKind {
    /// Canonical text form used for keys and labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded on a finished span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    /// No status was recorded.
    #[default]
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation failed.
    Error,
}

impl StatusCode {
    /// Canonical text form used for keys and labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Unset => "STATUS_CODE_UNSET",
            StatusCode::Ok => "STATUS_CODE_OK",
            StatusCode::Error => "STATUS_CODE_ERROR",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed attribute value carried by spans and resources.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// UTF-8 string value.
    Str(String),
    /// 64-bit signed integer value.
    Int(i64),
    /// 64-bit float value.
    Double(f64),
    /// Boolean value.
    Bool(bool),
    /// Absent or empty composite value.
    Empty,
}

impl AttributeValue {
    /// Canonical text form of the value.
    ///
    /// This single rule is used both when concatenating values into
    /// aggregation keys and when emitting data-point labels, so a key and
    /// the label set stored for it can never disagree.
    pub fn as_label_string(&self) -> String {
        match self {
            AttributeValue::Str(s) => s.clone(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Double(d) => d.to_string(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Empty => String::new(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Insertion-ordered attribute bag.
///
/// Keeps the order attributes were first written in, so label sets built
/// from configured dimensions come out in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    entries: Vec<(String, AttributeValue)>,
}

impl AttributeBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, keeping the original position on replace.
    pub fn upsert<K: Into<String>>(&mut self, key: K, value: AttributeValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bag holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One timed operation in a distributed trace.
#[derive(Debug, Clone)]
pub struct Span {
    /// Trace this span belongs to.
    pub trace_id: TraceId,
    /// Identifier of this span.
    pub span_id: SpanId,
    /// Name of the operation this span represents.
    pub operation_name: String,
    /// Span kind.
    pub kind: SpanKind,
    /// Recorded status.
    pub status: StatusCode,
    /// Start time, nanoseconds since the unix epoch.
    pub start_time_unix_nano: u64,
    /// End time, nanoseconds since the unix epoch.
    pub end_time_unix_nano: u64,
    /// Span attributes.
    pub attributes: HashMap<String, AttributeValue>,
}

impl Span {
    /// Creates a new span builder.
    pub fn builder() -> SpanBuilder {
        SpanBuilder::default()
    }

    /// Signed latency in milliseconds.
    ///
    /// Computed in floating point so that timestamps anywhere in the u64
    /// range, including end before start, produce a finite value.
    pub fn latency_ms(&self) -> f64 {
        (self.end_time_unix_nano as f64 - self.start_time_unix_nano as f64) / 1e6
    }

    /// Gets an attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Builder for creating Span instances
#[derive(Default)]
pub struct SpanBuilder {
    trace_id: TraceId,
    span_id: SpanId,
    operation_name: String,
    kind: SpanKind,
    status: StatusCode,
    start_time_unix_nano: u64,
    end_time_unix_nano: u64,
    attributes: HashMap<String, AttributeValue>,
}

impl SpanBuilder {
    pub fn trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn span_id(mut self, span_id: SpanId) -> Self {
        self.span_id = span_id;
        self
    }

    pub fn operation_name<S: Into<String>>(mut self, operation_name: S) -> Self {
        self.operation_name = operation_name.into();
        self
    }

    pub fn kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn start_time_unix_nano(mut self, nanos: u64) -> Self {
        self.start_time_unix_nano = nanos;
        self
    }

    pub fn end_time_unix_nano(mut self, nanos: u64) -> Self {
        self.end_time_unix_nano = nanos;
        self
    }

    pub fn attribute<K: Into<String>, V: Into<AttributeValue>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Span {
        Span {
            trace_id: self.trace_id,
            span_id: self.span_id,
            operation_name: self.operation_name,
            kind: self.kind,
            status: self.status,
            start_time_unix_nano: self.start_time_unix_nano,
            end_time_unix_nano: self.end_time_unix_nano,
            attributes: self.attributes,
        }
    }
}

/// Spans grouped by the instrumentation library that produced them.
#[derive(Debug, Clone, Default)]
pub struct LibrarySpans {
    /// Name of the producing instrumentation library.
    pub library_name: String,
    /// Spans emitted by that library.
    pub spans: Vec<Span>,
}

/// Spans grouped by the producing resource (process).
#[derive(Debug, Clone, Default)]
pub struct ResourceSpans {
    /// Resource attributes shared by every span in the group.
    pub attributes: HashMap<String, AttributeValue>,
    /// Per-library span groups.
    pub libraries: Vec<LibrarySpans>,
}

/// One batch of trace data as handed to the processor.
#[derive(Debug, Clone, Default)]
pub struct TraceBatch {
    /// Per-resource span groups.
    pub resource_spans: Vec<ResourceSpans>,
}

impl TraceBatch {
    /// Total number of spans in the batch.
    pub fn span_count(&self) -> usize {
        self.resource_spans
            .iter()
            .flat_map(|r| r.libraries.iter())
            .map(|l| l.spans.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_hex_and_empty() {
        let id = TraceId::new([0; 16]);
        assert!(id.is_empty());
        assert_eq!(id.hex_string(), "0".repeat(32));

        let mut bytes = [0u8; 16];
        bytes[15] = 0xab;
        let id = TraceId::new(bytes);
        assert!(!id.is_empty());
        assert!(id.hex_string().ends_with("ab"));
        assert_eq!(id.hex_string().len(), 32);
    }

    #[test]
    fn test_span_id_hex() {
        let id = SpanId::new([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(id.hex_string(), "0102030405060708");
        assert!(!id.is_empty());
        assert!(SpanId::default().is_empty());
    }

    #[test]
    fn test_span_builder() {
        let span = Span::builder()
            .operation_name("/ping")
            .kind(SpanKind::Server)
            .status(StatusCode::Ok)
            .start_time_unix_nano(1_000_000_000)
            .end_time_unix_nano(1_011_000_000)
            .attribute("region", "us-east-1")
            .build();

        assert_eq!(span.operation_name, "/ping");
        assert_eq!(span.latency_ms(), 11.0);
        assert_eq!(
            span.attribute("region"),
            Some(&AttributeValue::Str("us-east-1".to_string()))
        );
    }

    #[test]
    fn test_negative_latency_is_signed() {
        let span = Span::builder()
            .start_time_unix_nano(2_000_000)
            .end_time_unix_nano(1_000_000)
            .build();
        assert_eq!(span.latency_ms(), -1.0);
    }

    #[test]
    fn test_extreme_timestamps_stay_finite() {
        let span = Span::builder()
            .start_time_unix_nano(0)
            .end_time_unix_nano(u64::MAX)
            .build();
        assert!(span.latency_ms().is_finite());

        let span = Span::builder()
            .start_time_unix_nano(u64::MAX)
            .end_time_unix_nano(0)
            .build();
        assert!(span.latency_ms().is_finite());
        assert!(span.latency_ms() < 0.0);
    }

    #[test]
    fn test_attribute_value_stringification() {
        assert_eq!(AttributeValue::from("v").as_label_string(), "v");
        assert_eq!(AttributeValue::from(42i64).as_label_string(), "42");
        assert_eq!(AttributeValue::from(11.0).as_label_string(), "11");
        assert_eq!(AttributeValue::from(11.5).as_label_string(), "11.5");
        assert_eq!(AttributeValue::from(true).as_label_string(), "true");
        assert_eq!(AttributeValue::Empty.as_label_string(), "");
    }

    #[test]
    fn test_attribute_bag_keeps_insertion_order() {
        let mut bag = AttributeBag::new();
        bag.upsert("b", AttributeValue::from("1"));
        bag.upsert("a", AttributeValue::from("2"));
        bag.upsert("b", AttributeValue::from("3"));

        let keys: Vec<&str> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(bag.get("b"), Some(&AttributeValue::from("3")));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_trace_batch_span_count() {
        let batch = TraceBatch {
            resource_spans: vec![ResourceSpans {
                attributes: HashMap::new(),
                libraries: vec![LibrarySpans {
                    library_name: "lib".to_string(),
                    spans: vec![Span::builder().build(), Span::builder().build()],
                }],
            }],
        };
        assert_eq!(batch.span_count(), 2);
    }
}
