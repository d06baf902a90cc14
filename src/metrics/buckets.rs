//! Histogram bucket bounds for latency samples.

use std::sync::Arc;
use std::time::Duration;

/// Upper bound of the terminal catch-all bucket. Larger than any latency a
/// span can produce, since latencies are computed from finite timestamps.
pub const MAX_LATENCY_MS: f64 = f64::MAX;

/// Bounds applied when no explicit buckets are configured, in milliseconds.
const DEFAULT_LATENCY_HISTOGRAM_BUCKETS_MS: [f64; 17] = [
    2.0, 4.0, 6.0, 8.0, 10.0, 50.0, 100.0, 200.0, 400.0, 800.0, 1000.0, 1400.0, 2000.0, 5000.0,
    10_000.0, 15_000.0, MAX_LATENCY_MS,
];

/// Ordered histogram bounds in milliseconds, ending in a catch-all.
///
/// Shared by every emitted histogram data point, so the bounds live behind
/// an `Arc`.
#[derive(Debug, Clone)]
pub struct LatencyBounds {
    bounds: Arc<[f64]>,
}

impl Default for LatencyBounds {
    fn default() -> Self {
        LatencyBounds {
            bounds: Arc::from(DEFAULT_LATENCY_HISTOGRAM_BUCKETS_MS.as_slice()),
        }
    }
}

impl LatencyBounds {
    /// Builds bounds from configured bucket durations, appending the
    /// catch-all terminal bound.
    pub fn from_durations(buckets: &[Duration]) -> Self {
        let mut bounds: Vec<f64> = buckets.iter().map(|d| duration_to_millis(*d)).collect();
        bounds.push(MAX_LATENCY_MS);
        LatencyBounds {
            bounds: bounds.into(),
        }
    }

    /// Index of the bucket a latency sample belongs to: the first bound
    /// greater than or equal to the sample.
    ///
    /// Negative samples land in bucket 0; no finite sample can land past
    /// the terminal bound, so the result is always in range.
    pub fn bucket_index(&self, latency_ms: f64) -> usize {
        self.bounds.partition_point(|bound| *bound < latency_ms)
    }

    /// Number of bounds, including the catch-all.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Always false: the catch-all bound is always present.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// The bounds as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.bounds
    }

    /// A shared handle to the bounds for embedding in data points.
    pub fn shared(&self) -> Arc<[f64]> {
        Arc::clone(&self.bounds)
    }
}

/// Milliseconds represented by the duration; sub-millisecond durations
/// produce fractional values.
pub fn duration_to_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}
