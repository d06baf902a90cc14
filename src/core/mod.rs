//! Core domain types for the span-to-metrics processor.
//!
//! This module contains the trace-side data contracts, the configuration
//! surface, and the crate-wide error type.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AggregationTemporality, Config, ConfigBuilder, Dimension};
pub use error::{MetricsError, Result};
pub use types::{
    AttributeBag, AttributeValue, LibrarySpans, ResourceSpans, Span, SpanBuilder, SpanId,
    SpanKind, StatusCode, TraceBatch, TraceId,
};
