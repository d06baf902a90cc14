//! Configuration for the span-to-metrics processor.
//!
//! Supports YAML input with humantime bucket durations, programmatic
//! construction through [`ConfigBuilder`], and validation before the
//! processor is built.

use crate::core::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of the metric-key cache.
pub const DEFAULT_DIMENSIONS_CACHE_SIZE: usize = 1000;
/// Default capacity of the resource-key cache.
pub const DEFAULT_RESOURCE_ATTRIBUTES_CACHE_SIZE: usize = 1000;

/// An extra label to attach to emitted metrics.
///
/// The optional default distinguishes "attribute absent, drop the label"
/// (no default) from "attribute absent, substitute this value".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Attribute name to look up.
    pub name: String,
    /// Value substituted when the attribute is absent.
    #[serde(default)]
    pub default: Option<String>,
}

impl Dimension {
    /// A dimension with no default: absent attributes drop the label.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Dimension {
            name: name.into(),
            default: None,
        }
    }

    /// A dimension that falls back to the given value.
    pub fn with_default<S: Into<String>, D: Into<String>>(name: S, default: D) -> Self {
        Dimension {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// How emitted data points relate to previous emissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregationTemporality {
    /// Data points report totals since processor start.
    #[default]
    Cumulative,
    /// Data points report the increment since the previous emission;
    /// engine state resets after every emit.
    Delta,
}

/// Complete processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier of the downstream metrics exporter to forward snapshots to.
    pub metrics_exporter: String,
    /// Temporality applied to both emitted metric families.
    pub aggregation_temporality: AggregationTemporality,
    /// Explicit latency histogram buckets; the built-in defaults apply when
    /// absent. A catch-all upper bound is always appended.
    #[serde(with = "humantime_buckets")]
    pub latency_histogram_buckets: Option<Vec<Duration>>,
    /// Extra per-metric dimensions, in emission order.
    pub dimensions: Vec<Dimension>,
    /// Extra per-resource attributes, in emission order.
    pub resource_attributes: Vec<Dimension>,
    /// Capacity of the metric-key cache.
    pub dimensions_cache_size: usize,
    /// Capacity of the resource-key cache.
    pub resource_attributes_cache_size: usize,
    /// Attach span.id and trace.id as dimensions on every data point.
    pub attach_span_and_trace_id: bool,
    /// Group metrics under the instrumentation library name found on the
    /// input instead of the processor's own name.
    pub inherit_instrumentation_library_name: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            metrics_exporter: String::new(),
            aggregation_temporality: AggregationTemporality::default(),
            latency_histogram_buckets: None,
            dimensions: Vec::new(),
            resource_attributes: Vec::new(),
            dimensions_cache_size: DEFAULT_DIMENSIONS_CACHE_SIZE,
            resource_attributes_cache_size: DEFAULT_RESOURCE_ATTRIBUTES_CACHE_SIZE,
            attach_span_and_trace_id: false,
            inherit_instrumentation_library_name: false,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// Dimension name collisions are checked separately when the processor
    /// is built, since the reserved name sets belong to the engine.
    pub fn validate(&self) -> Result<()> {
        if self.metrics_exporter.is_empty() {
            return Err(MetricsError::config("metrics_exporter must not be empty"));
        }

        if self.dimensions_cache_size == 0 {
            return Err(MetricsError::config(
                "dimensions_cache_size must be greater than 0",
            ));
        }

        if self.resource_attributes_cache_size == 0 {
            return Err(MetricsError::config(
                "resource_attributes_cache_size must be greater than 0",
            ));
        }

        if let Some(buckets) = &self.latency_histogram_buckets {
            for pair in buckets.windows(2) {
                if pair[1] <= pair[0] {
                    return Err(MetricsError::config(format!(
                        "latency_histogram_buckets must be strictly increasing: {:?} does not follow {:?}",
                        pair[1], pair[0]
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Serde adapter for an optional list of humantime durations
/// (e.g. `["100ms", "2s"]`).
mod humantime_buckets {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Vec<Duration>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(buckets) => {
                let wrapped: Vec<humantime_serde::Serde<&Duration>> =
                    buckets.iter().map(humantime_serde::Serde::from).collect();
                wrapped.serialize(serializer)
            },
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<Duration>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wrapped: Option<Vec<humantime_serde::Serde<Duration>>> =
            Option::deserialize(deserializer)?;
        Ok(wrapped.map(|buckets| {
            buckets
                .into_iter()
                .map(humantime_serde::Serde::into_inner)
                .collect()
        }))
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| MetricsError::config(format!("failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the downstream metrics exporter identifier
    pub fn metrics_exporter<S: Into<String>>(mut self, name: S) -> Self {
        self.config.metrics_exporter = name.into();
        self
    }

    /// Set the aggregation temporality
    pub fn aggregation_temporality(mut self, temporality: AggregationTemporality) -> Self {
        self.config.aggregation_temporality = temporality;
        self
    }

    /// Set explicit latency histogram buckets
    pub fn latency_histogram_buckets(mut self, buckets: Vec<Duration>) -> Self {
        self.config.latency_histogram_buckets = Some(buckets);
        self
    }

    /// Add a per-metric dimension
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.config.dimensions.push(dimension);
        self
    }

    /// Add a per-resource attribute
    pub fn resource_attribute(mut self, dimension: Dimension) -> Self {
        self.config.resource_attributes.push(dimension);
        self
    }

    /// Set the metric-key cache capacity
    pub fn dimensions_cache_size(mut self, size: usize) -> Self {
        self.config.dimensions_cache_size = size;
        self
    }

    /// Set the resource-key cache capacity
    pub fn resource_attributes_cache_size(mut self, size: usize) -> Self {
        self.config.resource_attributes_cache_size = size;
        self
    }

    /// Attach span and trace ids as data-point dimensions
    pub fn attach_span_and_trace_id(mut self, attach: bool) -> Self {
        self.config.attach_span_and_trace_id = attach;
        self
    }

    /// Inherit the instrumentation library name from the input
    pub fn inherit_instrumentation_library_name(mut self, inherit: bool) -> Self {
        self.config.inherit_instrumentation_library_name = inherit;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
