//! Point records as they arrive inside tile payloads.
//!
//! A record is an open-ended JSON object. The helpers here coerce individual
//! field values into the shapes the layers need (numbers, categorical keys,
//! display text) without ever failing: anything that does not fit coerces to
//! `None` or an empty string.

use serde_json::{Map, Number, Value};

/// Open-ended mapping of field name to scalar value.
pub type Record = Map<String, Value>;

/// Field holding a point's stable id inside its record.
pub const ID_FIELD: &str = "uid";

/// Field holding a point's label priority.
pub const IMPORTANCE_FIELD: &str = "importance";

/// Returns the value of `name`, treating JSON `null` as missing.
pub fn field<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    record.get(name).filter(|v| !v.is_null())
}

/// Finite numeric value of a field.
///
/// Numeric strings (`"12.5"`) are accepted; everything else is `None`.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn field_number(record: &Record, name: &str) -> Option<f64> {
    field(record, name).and_then(number)
}

/// Key used to look a value up in a categorical color map.
///
/// Scalars key by their textual form, so `1`, `"1"` and `1.0` share a key.
/// `null` and composite values have no key.
pub fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(format_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Text rendered for a label.
pub fn label_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => format_number(n),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Text rendered for a tooltip cell. Composite values render as compact JSON.
pub fn tooltip_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        other => label_text(Some(other)),
    }
}

/// Id carried by a record, if any. Numeric ids are stringified.
pub fn record_id(record: &Record) -> Option<String> {
    field(record, ID_FIELD).and_then(category_key)
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
