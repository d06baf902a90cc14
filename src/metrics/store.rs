//! Nested aggregation state for the current emission window.

use crate::core::types::TraceId;
use crate::metrics::key::{LibKey, MetricKey, ResourceKey};
use rustc_hash::FxHashMap;

/// Three-level mapping: resource key, then library key, then metric key.
/// Inner maps are created lazily as tuples are first seen.
type Nested<T> = FxHashMap<ResourceKey, FxHashMap<LibKey, FxHashMap<MetricKey, T>>>;

/// Latency aggregate for one (resource, library, metric) tuple.
///
/// The bucket counts always sum to `count`; both are updated together.
#[derive(Debug, Clone)]
pub struct LatencyAggregate {
    /// Sum of latency samples in milliseconds.
    pub sum: f64,
    /// Number of samples.
    pub count: u64,
    /// Per-bucket sample counts, one slot per configured bound.
    pub bucket_counts: Vec<u64>,
}

impl LatencyAggregate {
    fn new(bucket_len: usize) -> Self {
        LatencyAggregate {
            sum: 0.0,
            count: 0,
            bucket_counts: vec![0; bucket_len],
        }
    }
}

/// Per-window call counters and latency histograms keyed by
/// (resource, library, metric).
#[derive(Debug, Default)]
pub struct AggregationStore {
    call_sum: Nested<u64>,
    latency: Nested<LatencyAggregate>,
}

impl AggregationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the call counter for the tuple.
    pub fn increment_calls(&mut self, resource: &ResourceKey, library: &LibKey, metric: &MetricKey) {
        *self
            .call_sum
            .entry(resource.clone())
            .or_default()
            .entry(library.clone())
            .or_default()
            .entry(metric.clone())
            .or_insert(0) += 1;
    }

    /// Records one latency sample into the tuple's sum, count, and bucket.
    pub fn record_latency(
        &mut self,
        resource: &ResourceKey,
        library: &LibKey,
        metric: &MetricKey,
        latency_ms: f64,
        bucket_index: usize,
        bucket_len: usize,
    ) {
        let aggregate = self
            .latency
            .entry(resource.clone())
            .or_default()
            .entry(library.clone())
            .or_default()
            .entry(metric.clone())
            .or_insert_with(|| LatencyAggregate::new(bucket_len));

        aggregate.bucket_counts[bucket_index] += 1;
        aggregate.sum += latency_ms;
        aggregate.count += 1;
    }

    /// Call counters grouped by library for one resource.
    pub fn calls_for_resource(
        &self,
        resource: &ResourceKey,
    ) -> Option<&FxHashMap<LibKey, FxHashMap<MetricKey, u64>>> {
        self.call_sum.get(resource)
    }

    /// Latency aggregates grouped by library for one resource.
    pub fn latency_for_resource(
        &self,
        resource: &ResourceKey,
    ) -> Option<&FxHashMap<LibKey, FxHashMap<MetricKey, LatencyAggregate>>> {
        self.latency.get(resource)
    }

    /// Call counter for one tuple; zero when the tuple was never seen.
    pub fn calls_of(&self, resource: &ResourceKey, library: &LibKey, metric: &MetricKey) -> u64 {
        self.call_sum
            .get(resource)
            .and_then(|by_library| by_library.get(library))
            .and_then(|by_metric| by_metric.get(metric))
            .copied()
            .unwrap_or(0)
    }

    /// Drops all aggregated data.
    pub fn reset(&mut self) {
        self.call_sum.clear();
        self.latency.clear();
    }

    /// Returns true when no tuple holds data.
    pub fn is_empty(&self) -> bool {
        self.call_sum.is_empty() && self.latency.is_empty()
    }
}

/// One sampled latency value and the trace it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExemplarSample {
    /// Trace the sample was taken from; may be empty for synthetic spans.
    pub trace_id: TraceId,
    /// Sampled latency in milliseconds.
    pub value_ms: f64,
}

/// Append-only exemplar samples per tuple, reset on every emission.
#[derive(Debug, Default)]
pub struct ExemplarStore {
    samples: Nested<Vec<ExemplarSample>>,
}

impl ExemplarStore {
    /// Appends one sample for the tuple.
    pub fn append(
        &mut self,
        resource: &ResourceKey,
        library: &LibKey,
        metric: &MetricKey,
        trace_id: TraceId,
        value_ms: f64,
    ) {
        self.samples
            .entry(resource.clone())
            .or_default()
            .entry(library.clone())
            .or_default()
            .entry(metric.clone())
            .or_default()
            .push(ExemplarSample { trace_id, value_ms });
    }

    /// Samples collected for the tuple in the current window.
    pub fn samples_of(
        &self,
        resource: &ResourceKey,
        library: &LibKey,
        metric: &MetricKey,
    ) -> &[ExemplarSample] {
        self.samples
            .get(resource)
            .and_then(|by_library| by_library.get(library))
            .and_then(|by_metric| by_metric.get(metric))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Discards all samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Returns true when no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
