//! Span-to-metrics aggregation engine.
//!
//! Turns an unbounded span stream into a bounded, per-batch metric
//! snapshot: opaque keys identify (resource, library, metric) tuples,
//! bounded caches carry the label sets behind those keys, and nested
//! counters accumulate calls and latency histograms between resets.

pub mod buckets;
pub mod cache;
pub mod dimensions;
pub mod key;
pub mod model;
pub mod processor;
pub mod store;

pub use buckets::LatencyBounds;
pub use cache::KeyCache;
pub use key::{KeyBuilder, LibKey, MetricKey, ResourceKey};
pub use model::{MetricsSnapshot, CALLS_METRIC_NAME, LATENCY_METRIC_NAME};
pub use processor::SpanMetricsProcessor;
pub use store::{AggregationStore, ExemplarStore};

/// Resource attribute naming the producing service.
pub const SERVICE_NAME_KEY: &str = "service.name";
/// Label carrying the span operation name.
pub const OPERATION_KEY: &str = "operation";
/// Label carrying the span kind.
pub const SPAN_KIND_KEY: &str = "span.kind";
/// Label carrying the span status code.
pub const STATUS_CODE_KEY: &str = "status.code";
/// Label carrying the trace id on data points and exemplars.
pub const TRACE_ID_KEY: &str = "trace.id";
/// Label carrying the span id on data points.
pub const SPAN_ID_KEY: &str = "span.id";
/// Library name metrics are grouped under when inheritance is off.
pub const INSTRUMENTATION_LIBRARY_NAME: &str = "spanmetrics";
