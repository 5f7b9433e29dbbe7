//! Turning a winning raw value into a value of the key's declared shape.
//!
//! Text from flags and environment variables is parsed. Typed values from a
//! file or a default are converted leniently: a whole float is accepted for an
//! integer, an integer for a float or a duration, a scalar for a list.

use toml::Value;

use crate::duration::{format_duration, parse_duration};
use crate::error::ValueTypeError;
use crate::schema::{SchemaEntry, Shape};
use crate::source::{RawValue, SourceValue};

/// Coerce `value` to the shape declared by `entry`.
pub fn coerce(entry: &SchemaEntry, value: &SourceValue) -> Result<Value, ValueTypeError> {
    let element = element_shape(entry);
    let result = match &value.raw {
        RawValue::Text(text) => from_text(entry.shape, element, text),
        RawValue::Typed(typed) => from_value(entry.shape, element, typed),
    };
    result.map_err(|reason| ValueTypeError {
        key: entry.key.clone(),
        provenance: value.provenance,
        expected: entry.shape,
        value: value.raw.to_string(),
        reason,
    })
}

/// Element shape of a list key, learned from its default's first element.
/// Unknown (empty or missing default) elements are parsed heuristically.
fn element_shape(entry: &SchemaEntry) -> Shape {
    match &entry.default {
        Some(Value::Array(items)) => items.first().map(Shape::of).unwrap_or(Shape::Any),
        _ => Shape::Any,
    }
}

fn from_text(shape: Shape, element: Shape, text: &str) -> Result<Value, String> {
    match shape {
        Shape::String => Ok(Value::String(text.to_string())),
        Shape::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| e.to_string()),
        Shape::Float => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| e.to_string()),
        Shape::Boolean => parse_bool(text).map(Value::Boolean),
        Shape::Duration => duration_from_text(text),
        Shape::List => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| from_text(element, Shape::String, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Shape::Any => Ok(parse_any(text)),
    }
}

fn from_value(shape: Shape, element: Shape, value: &Value) -> Result<Value, String> {
    match (shape, value) {
        (Shape::Any, v) => Ok(v.clone()),
        (_, Value::String(text)) if shape != Shape::List => from_text(shape, element, text),

        (Shape::String, Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
            Ok(Value::String(value.to_string()))
        }
        (Shape::String, Value::Datetime(d)) => Ok(Value::String(d.to_string())),

        (Shape::Integer, Value::Integer(i)) => Ok(Value::Integer(*i)),
        (Shape::Integer, Value::Float(f)) => whole_float(*f).map(Value::Integer),

        (Shape::Float, Value::Float(f)) => Ok(Value::Float(*f)),
        (Shape::Float, Value::Integer(i)) => Ok(Value::Float(*i as f64)),

        (Shape::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(*b)),
        (Shape::Boolean, Value::Integer(0)) => Ok(Value::Boolean(false)),
        (Shape::Boolean, Value::Integer(1)) => Ok(Value::Boolean(true)),

        (Shape::Duration, Value::Integer(secs)) => u64::try_from(*secs)
            .map(|s| Value::String(format_duration(std::time::Duration::from_secs(s))))
            .map_err(|_| "durations cannot be negative".to_string()),

        (Shape::List, Value::Array(items)) => items
            .iter()
            .map(|item| from_value(element, Shape::String, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Shape::List, Value::Table(_)) => Err("a table is not a list".into()),
        (Shape::List, scalar) => from_value(element, Shape::String, scalar).map(|v| Value::Array(vec![v])),

        (_, Value::Array(_)) => Err("a list is not a single value".into()),
        (_, Value::Table(_)) => Err("a table is not a single value".into()),
        (_, other) => Err(format!("{} values are not accepted", kind(other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "list",
        Value::Table(_) => "table",
    }
}

fn whole_float(f: f64) -> Result<i64, String> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(format!("{f} is not a whole number"))
    }
}

/// `true/false/1/0/t/f/yes/no`, any case.
pub fn parse_bool(text: &str) -> Result<bool, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Ok(true),
        "false" | "f" | "0" | "no" => Ok(false),
        _ => Err("expected one of true, false, 1, 0, t, f, yes, no".into()),
    }
}

fn duration_from_text(text: &str) -> Result<Value, String> {
    let text = text.trim();
    let duration = match text.parse::<u64>() {
        Ok(secs) => std::time::Duration::from_secs(secs),
        Err(_) => parse_duration(text).map_err(|e| e.to_string())?,
    };
    Ok(Value::String(format_duration(duration)))
}

/// Best guess for text with no declared shape: bool, then integer, then
/// float (only with a decimal point), then string.
pub fn parse_any(text: &str) -> Value {
    if text.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Integer(i);
    }
    if text.contains('.')
        && let Ok(f) = text.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(text.to_string())
}
