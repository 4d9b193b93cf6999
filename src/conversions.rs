//! Type conversions between tabular [`Value`]s and DynamoDB `AttributeValue`.
//!
//! Serialization picks the wire tag from an ordered rule table:
//!
//! 1. null-like markers (`Null`, `NaT`, NaN) → `NULL`
//! 2. timestamps and durations → `S`, canonical text
//! 3. integers → `N`, base-10 text
//! 4. floats → `N`, integral values without a fractional part
//! 5. everything else → the default mapping (`BOOL`, `S`, `B`, `L`, `M`)
//!
//! Deserialization is lossy on purpose: `N` becomes `Int` when integral and
//! `Float` otherwise, so a float written as `3.0` reads back as `Int(3)`.
//! Non-integral numbers are routed through `f64`; precision beyond that of a
//! double is not preserved.

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::value::{format_duration, Record, Value};

/// A DynamoDB item in wire form.
pub type Item = HashMap<String, AttributeValue>;

/// Convert one value to its DynamoDB wire form.
pub fn serialize(value: &Value) -> Result<AttributeValue> {
    // Null-like check must come before the numeric rules because NaN is a float
    if value.is_null_like() {
        return Ok(AttributeValue::Null(true));
    }

    match value {
        Value::Timestamp(ts) => Ok(AttributeValue::S(ts.to_string())),
        Value::Duration(d) => Ok(AttributeValue::S(format_duration(d))),
        Value::Int(i) => Ok(AttributeValue::N(i.to_string())),
        Value::Float(f) => serialize_float(*f).map(AttributeValue::N),
        Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
        Value::Str(s) => Ok(AttributeValue::S(s.clone())),
        Value::Binary(bytes) => Ok(AttributeValue::B(Blob::new(bytes.clone()))),
        Value::List(items) => {
            let items = items.iter().map(serialize).collect::<Result<Vec<_>>>()?;
            Ok(AttributeValue::L(items))
        }
        Value::Map(map) => Ok(AttributeValue::M(record_to_item(map)?)),
        Value::Null | Value::NaT => Ok(AttributeValue::Null(true)),
    }
}

/// Render a finite float as DynamoDB number text.
///
/// Integral values (`value % 1 == 0`) drop the fractional part entirely.
fn serialize_float(f: f64) -> Result<String> {
    if !f.is_finite() {
        return Err(Error::serialization(format!(
            "DynamoDB cannot store non-finite number {}",
            f
        )));
    }
    if f % 1.0 == 0.0 {
        // -0.0 renders as "-0", which the store rejects
        Ok(format!("{:.0}", f + 0.0))
    } else {
        Ok(f.to_string())
    }
}

/// Convert one DynamoDB wire value back to a [`Value`].
pub fn deserialize(value: AttributeValue) -> Result<Value> {
    match value {
        AttributeValue::N(n) => deserialize_number(&n),
        AttributeValue::S(s) => Ok(Value::Str(s)),
        AttributeValue::Bool(b) => Ok(Value::Bool(b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::B(b) => Ok(Value::Binary(b.into_inner())),
        AttributeValue::L(list) => {
            let items = list.into_iter().map(deserialize).collect::<Result<Vec<_>>>()?;
            Ok(Value::List(items))
        }
        AttributeValue::M(map) => Ok(Value::Map(item_to_record(map)?)),
        AttributeValue::Ss(ss) => Ok(Value::List(ss.into_iter().map(Value::Str).collect())),
        AttributeValue::Ns(ns) => {
            let items = ns
                .iter()
                .map(|n| deserialize_number(n))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(items))
        }
        AttributeValue::Bs(bs) => Ok(Value::List(
            bs.into_iter().map(|b| Value::Binary(b.into_inner())).collect(),
        )),
        _ => Err(Error::serialization("Unknown DynamoDB AttributeValue type")),
    }
}

/// Parse DynamoDB number text: integral values become `Int`, the rest `Float`.
fn deserialize_number(n: &str) -> Result<Value> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::Int(i));
    }

    let f: f64 = n
        .parse()
        .map_err(|_| Error::serialization(format!("Invalid number: {}", n)))?;

    if f % 1.0 == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Value::Int(f as i64))
    } else {
        Ok(Value::Float(f))
    }
}

/// Convert a record to a DynamoDB item, one attribute at a time.
pub fn record_to_item(record: &Record) -> Result<Item> {
    let mut item = HashMap::with_capacity(record.len());
    for (name, value) in record {
        item.insert(name.clone(), serialize(value)?);
    }
    Ok(item)
}

/// Convert a DynamoDB item to a record.
pub fn item_to_record(item: Item) -> Result<Record> {
    item.into_iter()
        .map(|(name, value)| Ok((name, deserialize(value)?)))
        .collect()
}
