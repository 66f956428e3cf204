//! Runtime type guard
//!
//! Rust signatures already pin the shapes of values passed between
//! components. These checks cover what the compiler cannot see: raw JSON
//! read back from storage or supplied by configuration, and floats that are
//! not finite.

use crate::error::{ValidationError, ValidationResult};
use crate::types::Id;
use serde_json::Value;

const MAX_PREVIEW: usize = 40;

/// Require a finite number
pub fn number(value: f64, context: &str) -> ValidationResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite {
            context: context.to_string(),
            value,
        })
    }
}

/// Require a JSON number that is finite
pub fn number_value(value: &Value, context: &str) -> ValidationResult<f64> {
    match value.as_f64() {
        Some(n) => number(n, context),
        None => Err(ValidationError::NotNumeric {
            context: context.to_string(),
            found: describe(value),
        }),
    }
}

/// Require a JSON list whose every element is an integral number
pub fn id_list(value: &Value, context: &str) -> ValidationResult<Vec<Id>> {
    let items = value.as_array().ok_or_else(|| ValidationError::NotList {
        context: context.to_string(),
        found: describe(value),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            integral(item).ok_or_else(|| ValidationError::InvalidId {
                index,
                found: describe(item),
            })
        })
        .collect()
}

/// Extract the numeric `id` field of a record
pub fn record_id(value: &Value, context: &str) -> ValidationResult<Id> {
    let id = value
        .get("id")
        .ok_or_else(|| ValidationError::InvalidRecord(format!("{} has no id", context)))?;
    integral(id).ok_or_else(|| {
        ValidationError::InvalidRecord(format!("{} id is not an integer: {}", context, describe(id)))
    })
}

fn integral(value: &Value) -> Option<Id> {
    if let Some(n) = value.as_i64() {
        return Some(Id(n));
    }
    // 3.0 is a valid id; 3.5 is not
    value
        .as_f64()
        .filter(|n| n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64)
        .map(|n| Id(n as i64))
}

fn describe(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    let mut preview = value.to_string();
    if preview.len() > MAX_PREVIEW {
        let mut cut = MAX_PREVIEW;
        while !preview.is_char_boundary(cut) {
            cut -= 1;
        }
        preview.truncate(cut);
        preview.push_str("...");
    }
    format!("{} {}", kind, preview)
}
