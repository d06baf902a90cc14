//! Dimension value resolution and label-name validation.

use crate::core::config::Dimension;
use crate::core::error::{MetricsError, Result};
use crate::core::types::AttributeValue;
use crate::metrics::OPERATION_KEY;
use std::collections::{HashMap, HashSet};

/// Resolves the value of a configured dimension for one span.
///
/// Span attributes take precedence as the more specific source, then
/// resource attributes, then the configured default. `None` means the
/// dimension contributes neither a key fragment nor a label for this span.
pub fn resolve_dimension(
    dimension: &Dimension,
    span_attrs: &HashMap<String, AttributeValue>,
    resource_attrs: &HashMap<String, AttributeValue>,
) -> Option<AttributeValue> {
    if let Some(value) = span_attrs.get(&dimension.name) {
        return Some(value.clone());
    }
    if let Some(value) = resource_attrs.get(&dimension.name) {
        return Some(value.clone());
    }
    dimension
        .default
        .as_ref()
        .map(|default| AttributeValue::Str(default.clone()))
}

/// Normalizes a label name the way strict metric exporters do: every code
/// point that is not a letter or digit becomes `_`, a leading digit gets a
/// `key_` prefix, a leading underscore gets a `key` prefix.
pub fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    if sanitized.starts_with(|c: char| c.is_numeric()) {
        sanitized = format!("key_{}", sanitized);
    } else if sanitized.starts_with('_') {
        sanitized = format!("key{}", sanitized);
    }
    sanitized
}

/// Rejects configured dimensions that collide with reserved label names,
/// in raw or sanitized form. Reserved names are seeded in both forms, so a
/// dimension can neither shadow a reserved label directly nor collide with
/// it after sanitization.
pub fn validate_dimensions(dimensions: &[Dimension], reserved: &[&str]) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for name in reserved {
        seen.insert((*name).to_string());
        seen.insert(sanitize(name));
    }
    seen.insert(OPERATION_KEY.to_string());

    for dimension in dimensions {
        if seen.contains(&dimension.name) {
            return Err(MetricsError::config(format!(
                "duplicate dimension name {}",
                dimension.name
            )));
        }
        seen.insert(dimension.name.clone());

        let sanitized = sanitize(&dimension.name);
        if sanitized == dimension.name {
            continue;
        }
        if seen.contains(&sanitized) {
            return Err(MetricsError::config(format!(
                "duplicate dimension name {} after sanitization",
                sanitized
            )));
        }
        seen.insert(sanitized);
    }

    Ok(())
}
