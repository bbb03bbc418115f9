//! Allowed-value matching, normalized per datatype.

use crate::dataset::{ObservedField, ObservedValue};
use crate::datatype::StorageType;
use crate::schema::{AllowedValue, FieldRule};

const DOUBLE_TOLERANCE: f64 = 1e-12;

/// True when every element of the observed value is in the allowed set or matches the pattern.
/// A missing or empty value never satisfies a constraint.
pub fn value_allowed(rule: &FieldRule, field: &ObservedField) -> bool {
    let Some(value) = &field.value else {
        return false;
    };
    let elements = value.elements();
    !elements.is_empty()
        && elements
            .iter()
            .all(|element| element_allowed(rule, element, &field.datatype))
}

fn element_allowed(rule: &FieldRule, element: &ObservedValue, storage: &StorageType) -> bool {
    if rule
        .allowed_values
        .iter()
        .any(|allowed| matches_literal(allowed, element, storage))
    {
        return true;
    }
    match &rule.pattern {
        Some(pattern) => pattern.is_match(&text_form(element)),
        None => false,
    }
}

fn matches_literal(allowed: &AllowedValue, observed: &ObservedValue, storage: &StorageType) -> bool {
    match (allowed, observed) {
        (AllowedValue::Text(expected), ObservedValue::Text(actual)) => {
            normalize_text(expected).eq_ignore_ascii_case(normalize_text(actual))
        }
        (AllowedValue::Integer(expected), ObservedValue::Integer(actual)) => expected == actual,
        (AllowedValue::Integer(expected), ObservedValue::Real(actual)) => {
            reals_equal(*expected as f64, *actual, storage)
        }
        (AllowedValue::Real(expected), ObservedValue::Real(actual)) => {
            reals_equal(*expected, *actual, storage)
        }
        (AllowedValue::Real(expected), ObservedValue::Integer(actual)) => {
            reals_equal(*expected, *actual as f64, storage)
        }
        (allowed, ObservedValue::Text(actual)) => allowed.to_string() == normalize_text(actual),
        (AllowedValue::Text(expected), other) => normalize_text(expected) == other.to_string(),
        (_, ObservedValue::List(_)) => false,
    }
}

/// Char attributes may carry padding and trailing NULs.
fn normalize_text(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

fn text_form(value: &ObservedValue) -> String {
    match value {
        ObservedValue::Text(text) => normalize_text(text).to_string(),
        other => other.to_string(),
    }
}

fn reals_equal(expected: f64, actual: f64, storage: &StorageType) -> bool {
    let tolerance = match storage {
        StorageType::Float32 => f64::from(f32::EPSILON),
        _ => DOUBLE_TOLERANCE,
    };
    let scale = expected.abs().max(actual.abs()).max(1.0);
    (expected - actual).abs() <= tolerance * scale
}
