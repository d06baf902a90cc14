//! Spanmetrics - a span-to-metrics aggregation pipeline stage.
//!
//! Consumes batches of distributed-tracing spans and emits two derived
//! metric families while forwarding the original trace data downstream
//! unmodified:
//!
//! - **`calls_total`**: a monotonic call counter
//! - **`latency`**: a latency histogram in milliseconds, with exemplars
//!
//! Both are broken down by service, operation, span kind, status code, and
//! any configured extra dimensions, with cumulative or delta temporality.
//!
//! # Architecture
//!
//! - `core`: trace-side data contracts, configuration, and errors
//! - `metrics`: the aggregation engine and the emitted snapshot model
//! - `pipeline`: collaborator traits for downstream sinks and the host
//!
//! # Example
//!
//! ```
//! use spanmetrics::core::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .metrics_exporter("prometheus")
//!     .attach_span_and_trace_id(true)
//!     .build()?;
//! assert_eq!(config.metrics_exporter, "prometheus");
//! # Ok::<(), spanmetrics::core::MetricsError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod core;
pub mod metrics;
pub mod pipeline;

pub use crate::core::{Config, ConfigBuilder, MetricsError, Result};
pub use crate::metrics::SpanMetricsProcessor;
