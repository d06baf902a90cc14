//! Collaborator contracts between the processor and the surrounding
//! pipeline: downstream sinks and the host that wires exporters up.

use crate::core::error::Result;
use crate::core::types::TraceBatch;
use crate::metrics::model::MetricsSnapshot;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Behavior a consumer declares to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerCapabilities {
    /// True when the consumer mutates the data handed to it.
    pub mutates_data: bool,
}

/// Downstream sink for metric snapshots.
#[async_trait::async_trait]
pub trait MetricsConsumer: Send + Sync {
    /// Consume one snapshot; errors propagate to the producing batch.
    async fn consume_metrics(&self, metrics: MetricsSnapshot) -> Result<()>;
}

/// Downstream sink for trace batches.
#[async_trait::async_trait]
pub trait TracesConsumer: Send + Sync {
    /// Consume one batch; errors propagate upstream.
    async fn consume_traces(&self, traces: TraceBatch) -> Result<()>;

    /// Consumers are read-only unless they say otherwise.
    fn capabilities(&self) -> ConsumerCapabilities {
        ConsumerCapabilities {
            mutates_data: false,
        }
    }
}

/// An exporter as configured on the host. Whether it actually is a metrics
/// exporter is only known at runtime.
#[derive(Clone)]
pub enum Exporter {
    /// A metrics exporter.
    Metrics(Arc<dyn MetricsConsumer>),
    /// A trace exporter.
    Traces(Arc<dyn TracesConsumer>),
    /// A log exporter.
    Logs,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exporter::Metrics(_) => f.write_str("Exporter::Metrics"),
            Exporter::Traces(_) => f.write_str("Exporter::Traces"),
            Exporter::Logs => f.write_str("Exporter::Logs"),
        }
    }
}

/// The host environment the processor starts inside.
pub trait PipelineHost: Send + Sync {
    /// All configured exporters keyed by identifier.
    fn exporters(&self) -> HashMap<String, Exporter>;
}
