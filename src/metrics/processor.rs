//! The span-to-metrics processor.
//!
//! Consumes trace batches, aggregates them into call counts and latency
//! histograms, forwards the resulting metric snapshot to the configured
//! metrics exporter, and passes the original trace data downstream
//! unmodified.

use crate::core::config::{AggregationTemporality, Config};
use crate::core::error::{MetricsError, Result};
use crate::core::types::{
    AttributeBag, AttributeValue, ResourceSpans, Span, TraceBatch,
};
use crate::metrics::buckets::LatencyBounds;
use crate::metrics::cache::KeyCache;
use crate::metrics::dimensions::{resolve_dimension, validate_dimensions};
use crate::metrics::key::{KeyBuilder, LibKey, MetricKey, ResourceKey};
use crate::metrics::model::{
    Exemplar, HistogramDataPoint, HistogramMetric, LibraryMetrics, Metric, MetricData,
    MetricsSnapshot, ResourceMetrics, SumDataPoint, SumMetric, CALLS_METRIC_NAME,
    LATENCY_METRIC_NAME,
};
use crate::metrics::store::{AggregationStore, ExemplarSample, ExemplarStore};
use crate::metrics::{
    INSTRUMENTATION_LIBRARY_NAME, OPERATION_KEY, SERVICE_NAME_KEY, SPAN_ID_KEY, SPAN_KIND_KEY,
    STATUS_CODE_KEY, TRACE_ID_KEY,
};
use crate::pipeline::{ConsumerCapabilities, Exporter, MetricsConsumer, PipelineHost, TracesConsumer};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Mutable aggregation state, owned exclusively under the processor lock.
struct AggregationState {
    store: AggregationStore,
    exemplars: ExemplarStore,
    metric_key_cache: KeyCache<MetricKey, AttributeBag>,
    resource_key_cache: KeyCache<ResourceKey, AttributeBag>,
}

/// Pipeline stage deriving `calls_total` and `latency` metrics from spans.
///
/// Batches may arrive concurrently from the surrounding pipeline; the
/// processor is stateful, so one exclusive lock serializes the whole
/// aggregate, snapshot, and reset sequence per batch. Downstream forwarding
/// happens outside the lock.
pub struct SpanMetricsProcessor {
    config: Config,
    latency_bounds: LatencyBounds,
    start_time: SystemTime,
    state: Mutex<AggregationState>,
    metrics_exporter: RwLock<Option<Arc<dyn MetricsConsumer>>>,
    next_consumer: Arc<dyn TracesConsumer>,
}

impl std::fmt::Debug for SpanMetricsProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanMetricsProcessor")
            .field("config", &self.config)
            .field("latency_bounds", &self.latency_bounds)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}

impl SpanMetricsProcessor {
    /// Builds the processor.
    ///
    /// Fails on invalid cache capacities, non-increasing bucket bounds, or
    /// configured dimensions that collide with reserved label names.
    pub fn new(config: Config, next_consumer: Arc<dyn TracesConsumer>) -> Result<Self> {
        tracing::info!("building span metrics processor");
        config.validate()?;
        validate_dimensions(&config.dimensions, &[SPAN_KIND_KEY, STATUS_CODE_KEY])?;
        validate_dimensions(&config.resource_attributes, &[SERVICE_NAME_KEY])?;

        let latency_bounds = match &config.latency_histogram_buckets {
            Some(buckets) => LatencyBounds::from_durations(buckets),
            None => LatencyBounds::default(),
        };

        let state = AggregationState {
            store: AggregationStore::new(),
            exemplars: ExemplarStore::default(),
            metric_key_cache: KeyCache::new(config.dimensions_cache_size)?,
            resource_key_cache: KeyCache::new(config.resource_attributes_cache_size)?,
        };

        Ok(SpanMetricsProcessor {
            latency_bounds,
            start_time: SystemTime::now(),
            state: Mutex::new(state),
            metrics_exporter: RwLock::new(None),
            next_consumer,
            config,
        })
    }

    /// Resolves the configured metrics exporter among the host's exporters.
    ///
    /// No spans may be consumed before this completes successfully.
    pub fn start(&self, host: &dyn PipelineHost) -> Result<()> {
        tracing::info!("starting span metrics processor");

        let mut available = Vec::new();
        let mut resolved = None;
        for (name, exporter) in host.exporters() {
            match exporter {
                Exporter::Metrics(consumer) => {
                    available.push(name.clone());
                    tracing::debug!(
                        configured = %self.config.metrics_exporter,
                        candidate = %name,
                        "looking for the configured metrics exporter"
                    );
                    if name == self.config.metrics_exporter {
                        resolved = Some(consumer);
                    }
                },
                Exporter::Traces(_) | Exporter::Logs => {
                    if name == self.config.metrics_exporter {
                        return Err(MetricsError::NotAMetricsExporter(name));
                    }
                },
            }
        }

        match resolved {
            Some(consumer) => {
                *self.metrics_exporter.write() = Some(consumer);
                tracing::info!(
                    exporter = %self.config.metrics_exporter,
                    "found metrics exporter"
                );
                Ok(())
            },
            None => {
                available.sort();
                Err(MetricsError::ExporterNotFound {
                    name: self.config.metrics_exporter.clone(),
                    available,
                })
            },
        }
    }

    /// The processor never mutates the trace data handed to it.
    pub fn capabilities(&self) -> ConsumerCapabilities {
        ConsumerCapabilities {
            mutates_data: false,
        }
    }

    /// Consumes one batch: aggregate, snapshot, reset, forward.
    ///
    /// The metric snapshot is exported before the trace data is forwarded,
    /// so downstream trace latency cannot delay metric emission.
    pub async fn consume(&self, traces: TraceBatch) -> Result<()> {
        let exporter = {
            let guard = self.metrics_exporter.read();
            guard.clone().ok_or(MetricsError::NotStarted)?
        };

        let snapshot = {
            let mut state = self.state.lock();
            self.aggregate_batch(&mut state, &traces);
            let snapshot = self.build_snapshot(&mut state);
            // Reset runs even when the snapshot failed, so a corrupted
            // window cannot leak into the next one.
            self.reset_state(&mut state);
            snapshot
        }?;

        exporter.consume_metrics(snapshot).await?;

        self.next_consumer.consume_traces(traces).await
    }

    /// Idempotent. In-flight batches finish on their own since the lock
    /// serializes them; there is no runtime state to tear down.
    pub fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down span metrics processor");
        Ok(())
    }

    fn aggregate_batch(&self, state: &mut AggregationState, traces: &TraceBatch) {
        for resource_spans in &traces.resource_spans {
            // A resource without a service name produces no metrics; its
            // spans are still forwarded downstream.
            let service_name = match resource_spans.attributes.get(SERVICE_NAME_KEY) {
                Some(AttributeValue::Str(name)) => name.clone(),
                _ => continue,
            };
            self.aggregate_resource_spans(state, resource_spans, &service_name);
        }
    }

    fn aggregate_resource_spans(
        &self,
        state: &mut AggregationState,
        resource_spans: &ResourceSpans,
        service_name: &str,
    ) {
        for library in &resource_spans.libraries {
            let library_key = if self.config.inherit_instrumentation_library_name {
                LibKey::new(library.library_name.clone())
            } else {
                LibKey::new(INSTRUMENTATION_LIBRARY_NAME.to_string())
            };

            for span in &library.spans {
                self.aggregate_span(
                    state,
                    span,
                    &resource_spans.attributes,
                    service_name,
                    &library_key,
                );
            }
        }
    }

    fn aggregate_span(
        &self,
        state: &mut AggregationState,
        span: &Span,
        resource_attrs: &HashMap<String, AttributeValue>,
        service_name: &str,
        library_key: &LibKey,
    ) {
        let latency_ms = span.latency_ms();
        let bucket_index = self.latency_bounds.bucket_index(latency_ms);

        let metric_key = self.build_metric_key(span, resource_attrs);
        let resource_key = self.build_resource_key(service_name, resource_attrs);

        // First writer wins: later spans with the same key leave the cached
        // bag untouched, and labels are later rebuilt from the cache alone.
        state
            .metric_key_cache
            .contains_or_add(metric_key.clone(), self.build_metric_labels(span, resource_attrs));
        state.resource_key_cache.contains_or_add(
            resource_key.clone(),
            self.build_resource_labels(service_name, resource_attrs),
        );

        state
            .store
            .increment_calls(&resource_key, library_key, &metric_key);
        state.store.record_latency(
            &resource_key,
            library_key,
            &metric_key,
            latency_ms,
            bucket_index,
            self.latency_bounds.len(),
        );
        state
            .exemplars
            .append(&resource_key, library_key, &metric_key, span.trace_id, latency_ms);
    }

    fn build_metric_key(
        &self,
        span: &Span,
        resource_attrs: &HashMap<String, AttributeValue>,
    ) -> MetricKey {
        let mut builder = KeyBuilder::new();
        builder
            .append(&span.operation_name)
            .append(span.kind.as_str())
            .append(span.status.as_str());

        if self.config.attach_span_and_trace_id {
            builder
                .append(&span.span_id.hex_string())
                .append(&span.trace_id.hex_string());
        }

        for dimension in &self.config.dimensions {
            if let Some(value) = resolve_dimension(dimension, &span.attributes, resource_attrs) {
                builder.append(&value.as_label_string());
            }
        }

        MetricKey::new(builder.build())
    }

    fn build_resource_key(
        &self,
        service_name: &str,
        resource_attrs: &HashMap<String, AttributeValue>,
    ) -> ResourceKey {
        let mut builder = KeyBuilder::new();
        builder.append(service_name);

        for attribute in &self.config.resource_attributes {
            if let Some(value) = resource_attrs.get(&attribute.name) {
                builder.append(&value.as_label_string());
            } else if let Some(default) = &attribute.default {
                builder.append(default);
            }
        }

        ResourceKey::new(builder.build())
    }

    fn build_metric_labels(
        &self,
        span: &Span,
        resource_attrs: &HashMap<String, AttributeValue>,
    ) -> AttributeBag {
        let mut bag = AttributeBag::new();
        bag.upsert(
            OPERATION_KEY,
            AttributeValue::Str(span.operation_name.clone()),
        );
        bag.upsert(
            SPAN_KIND_KEY,
            AttributeValue::Str(span.kind.as_str().to_string()),
        );
        bag.upsert(
            STATUS_CODE_KEY,
            AttributeValue::Str(span.status.as_str().to_string()),
        );

        if self.config.attach_span_and_trace_id {
            bag.upsert(SPAN_ID_KEY, AttributeValue::Str(span.span_id.hex_string()));
            bag.upsert(TRACE_ID_KEY, AttributeValue::Str(span.trace_id.hex_string()));
        }

        for dimension in &self.config.dimensions {
            if let Some(value) = resolve_dimension(dimension, &span.attributes, resource_attrs) {
                bag.upsert(dimension.name.clone(), value);
            }
        }
        bag
    }

    fn build_resource_labels(
        &self,
        service_name: &str,
        resource_attrs: &HashMap<String, AttributeValue>,
    ) -> AttributeBag {
        let mut bag = AttributeBag::new();
        bag.upsert(
            SERVICE_NAME_KEY,
            AttributeValue::Str(service_name.to_string()),
        );

        for attribute in &self.config.resource_attributes {
            if let Some(value) = resource_attrs.get(&attribute.name) {
                bag.upsert(attribute.name.clone(), value.clone());
            } else if let Some(default) = &attribute.default {
                bag.upsert(attribute.name.clone(), AttributeValue::Str(default.clone()));
            }
        }
        bag
    }

    /// Walks the resource-key cache and materializes one resource-metrics
    /// block per cached resource, rebuilding data-point labels from the
    /// cached bags rather than live span data.
    fn build_snapshot(&self, state: &mut AggregationState) -> Result<MetricsSnapshot> {
        let timestamp = SystemTime::now();
        let mut snapshot = MetricsSnapshot::new();

        let resource_keys: Vec<ResourceKey> = state.resource_key_cache.keys().cloned().collect();
        for resource_key in resource_keys {
            let resource_attributes = match state.resource_key_cache.get(&resource_key) {
                Some(bag) => bag.clone(),
                None => {
                    let err = MetricsError::cache_invariant(
                        "expected cached resource attributes not found",
                    );
                    tracing::error!("failed to build metric snapshot: {}", err);
                    return Err(err);
                },
            };

            // No service name means the resource is invalid for metrics.
            if !resource_attributes.contains_key(SERVICE_NAME_KEY) {
                continue;
            }

            let mut resource_metrics = ResourceMetrics {
                attributes: resource_attributes,
                library_metrics: Vec::new(),
            };

            self.collect_call_metrics(
                &state.store,
                &mut state.metric_key_cache,
                &resource_key,
                &mut resource_metrics,
                timestamp,
            )?;
            self.collect_latency_metrics(
                &state.store,
                &state.exemplars,
                &mut state.metric_key_cache,
                &resource_key,
                &mut resource_metrics,
                timestamp,
            )?;

            snapshot.resource_metrics.push(resource_metrics);
        }

        Ok(snapshot)
    }

    fn collect_call_metrics(
        &self,
        store: &AggregationStore,
        metric_key_cache: &mut KeyCache<MetricKey, AttributeBag>,
        resource_key: &ResourceKey,
        out: &mut ResourceMetrics,
        timestamp: SystemTime,
    ) -> Result<()> {
        let Some(by_library) = store.calls_for_resource(resource_key) else {
            return Ok(());
        };

        for (library_key, by_metric) in by_library {
            let mut library_metrics = LibraryMetrics {
                library_name: library_key.as_str().to_string(),
                metrics: Vec::new(),
            };

            for (metric_key, call_count) in by_metric {
                let labels = Self::metric_labels(metric_key_cache, metric_key)?;
                library_metrics.metrics.push(Metric {
                    name: CALLS_METRIC_NAME.to_string(),
                    data: MetricData::Sum(SumMetric {
                        is_monotonic: true,
                        temporality: self.config.aggregation_temporality,
                        data_points: vec![SumDataPoint {
                            labels,
                            start_timestamp: self.start_time,
                            timestamp,
                            value: *call_count,
                        }],
                    }),
                });
            }

            out.library_metrics.push(library_metrics);
        }
        Ok(())
    }

    fn collect_latency_metrics(
        &self,
        store: &AggregationStore,
        exemplars: &ExemplarStore,
        metric_key_cache: &mut KeyCache<MetricKey, AttributeBag>,
        resource_key: &ResourceKey,
        out: &mut ResourceMetrics,
        timestamp: SystemTime,
    ) -> Result<()> {
        let Some(by_library) = store.latency_for_resource(resource_key) else {
            return Ok(());
        };

        for (library_key, by_metric) in by_library {
            let mut library_metrics = LibraryMetrics {
                library_name: library_key.as_str().to_string(),
                metrics: Vec::new(),
            };

            for (metric_key, aggregate) in by_metric {
                let labels = Self::metric_labels(metric_key_cache, metric_key)?;
                let samples = exemplars.samples_of(resource_key, library_key, metric_key);
                library_metrics.metrics.push(Metric {
                    name: LATENCY_METRIC_NAME.to_string(),
                    data: MetricData::Histogram(HistogramMetric {
                        temporality: self.config.aggregation_temporality,
                        data_points: vec![HistogramDataPoint {
                            labels,
                            start_timestamp: self.start_time,
                            timestamp,
                            explicit_bounds: self.latency_bounds.shared(),
                            bucket_counts: aggregate.bucket_counts.clone(),
                            count: aggregate.count,
                            sum: aggregate.sum,
                            exemplars: build_exemplars(samples, timestamp),
                        }],
                    }),
                });
            }

            out.library_metrics.push(library_metrics);
        }
        Ok(())
    }

    fn metric_labels(
        metric_key_cache: &mut KeyCache<MetricKey, AttributeBag>,
        key: &MetricKey,
    ) -> Result<Vec<(String, String)>> {
        match metric_key_cache.get(key) {
            Some(bag) => Ok(bag
                .iter()
                .map(|(name, value)| (name.to_string(), value.as_label_string()))
                .collect()),
            None => {
                let err = MetricsError::cache_invariant(format!(
                    "value not found in metric key cache by key {:?}",
                    key.as_str()
                ));
                tracing::error!("failed to build data point labels: {}", err);
                Err(err)
            },
        }
    }

    fn reset_state(&self, state: &mut AggregationState) {
        if self.config.aggregation_temporality == AggregationTemporality::Delta {
            state.store.reset();
            state.metric_key_cache.purge();
            state.resource_key_cache.purge();
        } else {
            state.metric_key_cache.sweep();
            state.resource_key_cache.sweep();
        }

        // Exemplars are punctual values tied to the emission window, not
        // metrics that persist over time.
        state.exemplars.reset();
    }
}

#[async_trait::async_trait]
impl TracesConsumer for SpanMetricsProcessor {
    async fn consume_traces(&self, traces: TraceBatch) -> Result<()> {
        self.consume(traces).await
    }

    fn capabilities(&self) -> ConsumerCapabilities {
        SpanMetricsProcessor::capabilities(self)
    }
}

fn build_exemplars(samples: &[ExemplarSample], timestamp: SystemTime) -> Vec<Exemplar> {
    samples
        .iter()
        .filter(|sample| !sample.trace_id.is_empty())
        .map(|sample| Exemplar {
            value: sample.value_ms,
            timestamp,
            filtered_labels: vec![(TRACE_ID_KEY.to_string(), sample.trace_id.hex_string())],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ConfigBuilder, Dimension};
    use crate::core::types::{LibrarySpans, SpanKind, StatusCode, TraceId};

    #[derive(Default)]
    struct CapturingMetricsSink {
        snapshots: Mutex<Vec<MetricsSnapshot>>,
    }

    #[async_trait::async_trait]
    impl MetricsConsumer for CapturingMetricsSink {
        async fn consume_metrics(&self, metrics: MetricsSnapshot) -> Result<()> {
            self.snapshots.lock().push(metrics);
            Ok(())
        }
    }

    struct NoopTraceSink;

    #[async_trait::async_trait]
    impl TracesConsumer for NoopTraceSink {
        async fn consume_traces(&self, _traces: TraceBatch) -> Result<()> {
            Ok(())
        }
    }

    struct TestHost {
        exporters: HashMap<String, Exporter>,
    }

    impl PipelineHost for TestHost {
        fn exporters(&self) -> HashMap<String, Exporter> {
            self.exporters.clone()
        }
    }

    fn span(operation: &str) -> Span {
        Span::builder()
            .trace_id(TraceId::new([1; 16]))
            .operation_name(operation)
            .kind(SpanKind::Server)
            .status(StatusCode::Ok)
            .start_time_unix_nano(1_000_000_000)
            .end_time_unix_nano(1_011_000_000)
            .build()
    }

    fn batch_of(operations: &[&str]) -> TraceBatch {
        TraceBatch {
            resource_spans: vec![ResourceSpans {
                attributes: HashMap::from([(
                    SERVICE_NAME_KEY.to_string(),
                    AttributeValue::from("service-a"),
                )]),
                libraries: vec![LibrarySpans {
                    library_name: "test-lib".to_string(),
                    spans: operations.iter().map(|op| span(op)).collect(),
                }],
            }],
        }
    }

    fn started_processor(
        config: Config,
    ) -> (Arc<SpanMetricsProcessor>, Arc<CapturingMetricsSink>) {
        let exporter_name = config.metrics_exporter.clone();
        let processor =
            Arc::new(SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap());
        let sink = Arc::new(CapturingMetricsSink::default());
        let host = TestHost {
            exporters: HashMap::from([(
                exporter_name,
                Exporter::Metrics(sink.clone() as Arc<dyn MetricsConsumer>),
            )]),
        };
        processor.start(&host).unwrap();
        (processor, sink)
    }

    #[test]
    fn test_duplicate_dimension_rejected() {
        let config = ConfigBuilder::new()
            .metrics_exporter("sink")
            .dimension(Dimension::new("status_code"))
            .build()
            .unwrap();
        let err = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap_err();
        assert!(err
            .to_string()
            .contains("duplicate dimension name status_code"));
    }

    #[test]
    fn test_duplicate_resource_attribute_rejected() {
        let config = ConfigBuilder::new()
            .metrics_exporter("sink")
            .resource_attribute(Dimension::new("service.name"))
            .build()
            .unwrap();
        assert!(SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).is_err());
    }

    #[test]
    fn test_metric_key_is_deterministic() {
        let config = ConfigBuilder::new()
            .metrics_exporter("sink")
            .dimension(Dimension::new("d1"))
            .dimension(Dimension::new("d2"))
            .build()
            .unwrap();
        let processor = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap();

        let span = Span::builder()
            .operation_name("ping")
            .kind(SpanKind::Server)
            .status(StatusCode::Ok)
            .attribute("d1", "x")
            .attribute("d2", "y")
            .build();
        let resource_attrs = HashMap::new();

        assert_eq!(
            processor.build_metric_key(&span, &resource_attrs),
            processor.build_metric_key(&span, &resource_attrs)
        );
    }

    #[test]
    fn test_metric_key_fragment_boundaries_do_not_collide() {
        let config = ConfigBuilder::new()
            .metrics_exporter("sink")
            .dimension(Dimension::new("d1"))
            .dimension(Dimension::new("d2"))
            .build()
            .unwrap();
        let processor = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap();
        let resource_attrs = HashMap::new();

        // Same concatenated characters, split differently across dimensions.
        let first = Span::builder()
            .operation_name("ping")
            .attribute("d1", "c")
            .attribute("d2", "ab")
            .build();
        let second = Span::builder()
            .operation_name("ping")
            .attribute("d1", "ca")
            .attribute("d2", "b")
            .build();

        assert_ne!(
            processor.build_metric_key(&first, &resource_attrs),
            processor.build_metric_key(&second, &resource_attrs)
        );
    }

    #[test]
    fn test_metric_key_changes_with_attached_ids() {
        let config = ConfigBuilder::new()
            .metrics_exporter("sink")
            .attach_span_and_trace_id(true)
            .build()
            .unwrap();
        let processor = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap();
        let resource_attrs = HashMap::new();

        let first = span("ping");
        let mut second = span("ping");
        second.trace_id = TraceId::new([9; 16]);

        assert_ne!(
            processor.build_metric_key(&first, &resource_attrs),
            processor.build_metric_key(&second, &resource_attrs)
        );
    }

    #[test]
    fn test_resource_key_uses_configured_defaults() {
        let config = ConfigBuilder::new()
            .metrics_exporter("sink")
            .resource_attribute(Dimension::with_default("region", "unknown"))
            .build()
            .unwrap();
        let processor = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap();

        let with_region = HashMap::from([(
            "region".to_string(),
            AttributeValue::from("us-east-1"),
        )]);
        let without_region = HashMap::new();

        assert_ne!(
            processor.build_resource_key("service-a", &with_region),
            processor.build_resource_key("service-a", &without_region)
        );
        // The default still contributes a fragment.
        assert_eq!(
            processor.build_resource_key("service-a", &without_region).as_str(),
            "service-a\u{0}unknown"
        );
    }

    #[tokio::test]
    async fn test_consume_before_start_fails() {
        let config = ConfigBuilder::new().metrics_exporter("sink").build().unwrap();
        let processor = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap();

        let err = processor.consume(batch_of(&["ping"])).await.unwrap_err();
        assert!(matches!(err, MetricsError::NotStarted));
    }

    #[tokio::test]
    async fn test_deferred_eviction_keeps_batch_complete() {
        let config = ConfigBuilder::new()
            .metrics_exporter("capture")
            .dimensions_cache_size(2)
            .resource_attributes_cache_size(2)
            .build()
            .unwrap();
        let (processor, sink) = started_processor(config);

        // Three distinct metric keys against a cache that holds two.
        processor
            .consume(batch_of(&["op-1", "op-2", "op-3"]))
            .await
            .unwrap();

        let snapshots = sink.snapshots.lock();
        let snapshot = &snapshots[0];
        assert_eq!(snapshot.resource_metrics.len(), 1);
        // All three rows of both families materialize despite the eviction.
        assert_eq!(snapshot.metric_count(), 6);
        assert_eq!(snapshot.data_point_count(), 6);

        // After the emit, only the two most recently inserted keys survive.
        let mut state = processor.state.lock();
        assert_eq!(state.metric_key_cache.active_len(), 2);
        assert_eq!(state.metric_key_cache.held_len(), 0);

        let resource_attrs = HashMap::from([(
            SERVICE_NAME_KEY.to_string(),
            AttributeValue::from("service-a"),
        )]);
        let evicted_key = processor.build_metric_key(&span("op-1"), &resource_attrs);
        let kept_key = processor.build_metric_key(&span("op-3"), &resource_attrs);
        assert!(state.metric_key_cache.get(&evicted_key).is_none());
        assert!(state.metric_key_cache.get(&kept_key).is_some());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let config = ConfigBuilder::new().metrics_exporter("capture").build().unwrap();
        let (processor, _sink) = started_processor(config);

        assert!(processor.shutdown().is_ok());
        assert!(processor.shutdown().is_ok());
    }

    #[test]
    fn test_capabilities_declare_read_only() {
        let config = ConfigBuilder::new().metrics_exporter("sink").build().unwrap();
        let processor = SpanMetricsProcessor::new(config, Arc::new(NoopTraceSink)).unwrap();
        assert!(!processor.capabilities().mutates_data);
    }
}
