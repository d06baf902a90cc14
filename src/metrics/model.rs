//! The metric snapshot model emitted to the downstream metrics sink.

use crate::core::config::AggregationTemporality;
use crate::core::types::AttributeBag;
use std::sync::Arc;
use std::time::SystemTime;

/// Name of the monotonic call counter metric.
pub const CALLS_METRIC_NAME: &str = "calls_total";
/// Name of the latency histogram metric.
pub const LATENCY_METRIC_NAME: &str = "latency";

/// The full snapshot produced for one consumed batch.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Per-resource metric blocks.
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl MetricsSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of metrics across all blocks.
    pub fn metric_count(&self) -> usize {
        self.resource_metrics
            .iter()
            .flat_map(|r| r.library_metrics.iter())
            .map(|l| l.metrics.len())
            .sum()
    }

    /// Total number of data points across all metrics.
    pub fn data_point_count(&self) -> usize {
        self.resource_metrics
            .iter()
            .flat_map(|r| r.library_metrics.iter())
            .flat_map(|l| l.metrics.iter())
            .map(|m| m.data.data_point_count())
            .sum()
    }
}

/// Metrics attributed to one resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceMetrics {
    /// Resource attributes, service.name first.
    pub attributes: AttributeBag,
    /// Per-library metric blocks.
    pub library_metrics: Vec<LibraryMetrics>,
}

/// Metrics attributed to one instrumentation library.
#[derive(Debug, Clone, Default)]
pub struct LibraryMetrics {
    /// Library name the metrics are grouped under.
    pub library_name: String,
    /// Metrics in this block.
    pub metrics: Vec<Metric>,
}

/// One named metric.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name.
    pub name: String,
    /// Typed payload.
    pub data: MetricData,
}

/// Payload of a metric.
#[derive(Debug, Clone)]
pub enum MetricData {
    /// A sum of integer values.
    Sum(SumMetric),
    /// A latency histogram.
    Histogram(HistogramMetric),
}

impl MetricData {
    /// Number of data points in the payload.
    pub fn data_point_count(&self) -> usize {
        match self {
            MetricData::Sum(sum) => sum.data_points.len(),
            MetricData::Histogram(histogram) => histogram.data_points.len(),
        }
    }
}

/// Integer sum metric.
#[derive(Debug, Clone)]
pub struct SumMetric {
    /// True when the sum only ever increases.
    pub is_monotonic: bool,
    /// Temporality of the data points.
    pub temporality: AggregationTemporality,
    /// Data points.
    pub data_points: Vec<SumDataPoint>,
}

/// One sum data point.
#[derive(Debug, Clone)]
pub struct SumDataPoint {
    /// Identifying labels, in declaration order.
    pub labels: Vec<(String, String)>,
    /// Start of the reporting window.
    pub start_timestamp: SystemTime,
    /// Emission time.
    pub timestamp: SystemTime,
    /// Accumulated value.
    pub value: u64,
}

/// Histogram metric in milliseconds.
#[derive(Debug, Clone)]
pub struct HistogramMetric {
    /// Temporality of the data points.
    pub temporality: AggregationTemporality,
    /// Data points.
    pub data_points: Vec<HistogramDataPoint>,
}

/// One histogram data point.
#[derive(Debug, Clone)]
pub struct HistogramDataPoint {
    /// Identifying labels, in declaration order.
    pub labels: Vec<(String, String)>,
    /// Start of the reporting window.
    pub start_timestamp: SystemTime,
    /// Emission time.
    pub timestamp: SystemTime,
    /// Bucket upper bounds shared across data points.
    pub explicit_bounds: Arc<[f64]>,
    /// Per-bucket counts; sums to `count`.
    pub bucket_counts: Vec<u64>,
    /// Number of recorded samples.
    pub count: u64,
    /// Sum of recorded samples in milliseconds.
    pub sum: f64,
    /// Sampled values with trace identity.
    pub exemplars: Vec<Exemplar>,
}

/// One exemplar attached to a histogram data point.
#[derive(Debug, Clone)]
pub struct Exemplar {
    /// Sampled latency in milliseconds.
    pub value: f64,
    /// Emission time of the window the sample belongs to.
    pub timestamp: SystemTime,
    /// Filtered labels; carries the trace.id of the sampled span.
    pub filtered_labels: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let now = SystemTime::now();
        let snapshot = MetricsSnapshot {
            resource_metrics: vec![ResourceMetrics {
                attributes: AttributeBag::new(),
                library_metrics: vec![LibraryMetrics {
                    library_name: "lib".to_string(),
                    metrics: vec![
                        Metric {
                            name: CALLS_METRIC_NAME.to_string(),
                            data: MetricData::Sum(SumMetric {
                                is_monotonic: true,
                                temporality: AggregationTemporality::Cumulative,
                                data_points: vec![SumDataPoint {
                                    labels: Vec::new(),
                                    start_timestamp: now,
                                    timestamp: now,
                                    value: 1,
                                }],
                            }),
                        },
                        Metric {
                            name: LATENCY_METRIC_NAME.to_string(),
                            data: MetricData::Histogram(HistogramMetric {
                                temporality: AggregationTemporality::Cumulative,
                                data_points: vec![HistogramDataPoint {
                                    labels: Vec::new(),
                                    start_timestamp: now,
                                    timestamp: now,
                                    explicit_bounds: Arc::from([f64::MAX].as_slice()),
                                    bucket_counts: vec![1],
                                    count: 1,
                                    sum: 11.0,
                                    exemplars: Vec::new(),
                                }],
                            }),
                        },
                    ],
                }],
            }],
        };

        assert_eq!(snapshot.metric_count(), 2);
        assert_eq!(snapshot.data_point_count(), 2);
        assert_eq!(MetricsSnapshot::new().metric_count(), 0);
    }
}
