//! Column-oriented in-memory tables.
//!
//! A [`Frame`] holds named, typed [`Column`]s of equal length. Frames are built
//! from records (dtype inferred per column), converted back to records one row
//! at a time, and re-typed with [`Frame::astype`].

use chrono::{FixedOffset, TimeDelta};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::value::{parse_duration, Record, Timestamp, Value};

/// Target dtypes for [`Frame::astype`], keyed by column name.
pub type DTypeMap = BTreeMap<String, DType>;

/// Width of a nullable integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    fn bounds(self) -> (i64, i64) {
        match self {
            IntWidth::I8 => (i8::MIN.into(), i8::MAX.into()),
            IntWidth::I16 => (i16::MIN.into(), i16::MAX.into()),
            IntWidth::I32 => (i32::MIN.into(), i32::MAX.into()),
            IntWidth::I64 => (i64::MIN, i64::MAX),
        }
    }

    fn bits(self) -> u8 {
        match self {
            IntWidth::I8 => 8,
            IntWidth::I16 => 16,
            IntWidth::I32 => 32,
            IntWidth::I64 => 64,
        }
    }
}

/// Column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    /// Anything goes; missing values are `Null`.
    Object,
    /// Integers without missing values.
    Int64,
    /// Integers where `Null` marks a missing value.
    NullableInt(IntWidth),
    /// Floats where NaN marks a missing value.
    Float64,
    Bool,
    /// Naive timestamps; `NaT` marks a missing value.
    Datetime,
    /// Timestamps at a fixed offset; `NaT` marks a missing value.
    DatetimeTz(FixedOffset),
    /// Durations; `NaT` marks a missing value.
    Timedelta,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Object => f.write_str("object"),
            DType::Int64 => f.write_str("int64"),
            DType::NullableInt(w) => write!(f, "Int{}", w.bits()),
            DType::Float64 => f.write_str("float64"),
            DType::Bool => f.write_str("bool"),
            DType::Datetime => f.write_str("datetime64[ns]"),
            DType::DatetimeTz(off) if off.local_minus_utc() == 0 => {
                f.write_str("datetime64[ns, UTC]")
            }
            DType::DatetimeTz(off) => write!(f, "datetime64[ns, {}]", off),
            DType::Timedelta => f.write_str("timedelta64[ns]"),
        }
    }
}

impl FromStr for DType {
    type Err = Error;

    /// Accepts the names produced by `Display` plus a few common aliases.
    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s.trim() {
            "object" | "str" => DType::Object,
            "int64" | "int" => DType::Int64,
            "Int8" => DType::NullableInt(IntWidth::I8),
            "Int16" => DType::NullableInt(IntWidth::I16),
            "Int32" => DType::NullableInt(IntWidth::I32),
            "Int64" => DType::NullableInt(IntWidth::I64),
            "float64" | "float" => DType::Float64,
            "bool" => DType::Bool,
            "datetime64" | "datetime64[ns]" => DType::Datetime,
            "timedelta64" | "timedelta64[ns]" => DType::Timedelta,
            other => {
                let tz = other
                    .strip_prefix("datetime64[ns, ")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| Error::type_error(format!("data type '{}' not understood", s)))?;
                let offset = if tz == "UTC" {
                    FixedOffset::east_opt(0)
                } else {
                    tz.parse::<FixedOffset>().ok()
                };
                let offset = offset
                    .ok_or_else(|| Error::type_error(format!("unknown time zone '{}'", tz)))?;
                DType::DatetimeTz(offset)
            }
        };
        Ok(dtype)
    }
}

/// Convert a single value to the given dtype.
pub fn cast(value: &Value, dtype: DType) -> Result<Value> {
    let fail = || {
        Error::type_error(format!(
            "cannot convert {} value {:?} to {}",
            value.type_name(),
            value,
            dtype
        ))
    };

    match dtype {
        DType::Object => Ok(value.clone()),
        DType::Int64 | DType::NullableInt(_) => {
            if value.is_null_like() {
                return match dtype {
                    DType::Int64 => Err(Error::type_error(
                        "cannot convert missing values to int64; use a nullable integer dtype",
                    )),
                    _ => Ok(Value::Null),
                };
            }
            let i = match value {
                Value::Int(i) => *i,
                Value::Bool(b) => i64::from(*b),
                Value::Float(f)
                    if f % 1.0 == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
                {
                    *f as i64
                }
                Value::Str(s) => s.trim().parse().map_err(|_| fail())?,
                _ => return Err(fail()),
            };
            if let DType::NullableInt(width) = dtype {
                let (lo, hi) = width.bounds();
                if i < lo || i > hi {
                    return Err(fail());
                }
            }
            Ok(Value::Int(i))
        }
        DType::Float64 => match value {
            v if v.is_null_like() => Ok(Value::Float(f64::NAN)),
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| fail()),
            _ => Err(fail()),
        },
        DType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::Str(s) => match s.trim() {
                "True" | "true" => Ok(Value::Bool(true)),
                "False" | "false" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        DType::Datetime | DType::DatetimeTz(_) => {
            if value.is_null_like() {
                return Ok(Value::NaT);
            }
            let ts = match value {
                Value::Timestamp(ts) => *ts,
                Value::Str(s) => Timestamp::parse(s)?,
                _ => return Err(fail()),
            };
            Ok(Value::Timestamp(match (dtype, ts) {
                (DType::DatetimeTz(offset), ts) => ts.with_offset(offset),
                (_, Timestamp::Aware(dt)) => Timestamp::Naive(dt.naive_utc()),
                (_, naive) => naive,
            }))
        }
        DType::Timedelta => match value {
            v if v.is_null_like() => Ok(Value::NaT),
            Value::Duration(d) => Ok(Value::Duration(*d)),
            Value::Str(s) => parse_duration(s).map(Value::Duration),
            Value::Int(ns) => Ok(Value::Duration(TimeDelta::nanoseconds(*ns))),
            _ => Err(fail()),
        },
    }
}

/// Pick the narrowest dtype that holds every value, pandas style.
///
/// Integers mixed with missing values widen to `Float64`.
pub fn infer_dtype(values: &[Value]) -> DType {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null_like()).collect();
    let has_missing = present.len() < values.len();

    if present.is_empty() {
        // A column of NaN floats stays numeric
        if !values.is_empty() && values.iter().all(|v| matches!(v, Value::Float(_))) {
            return DType::Float64;
        }
        return DType::Object;
    }

    let all = |pred: fn(&Value) -> bool| present.iter().all(|v| pred(v));

    if all(|v| matches!(v, Value::Int(_))) && !has_missing {
        DType::Int64
    } else if all(|v| matches!(v, Value::Int(_) | Value::Float(_))) {
        DType::Float64
    } else if all(|v| matches!(v, Value::Bool(_))) && !has_missing {
        DType::Bool
    } else if all(|v| matches!(v, Value::Duration(_))) {
        DType::Timedelta
    } else if all(|v| matches!(v, Value::Timestamp(Timestamp::Naive(_)))) {
        DType::Datetime
    } else if let Some(offset) = common_offset(&present) {
        DType::DatetimeTz(offset)
    } else {
        DType::Object
    }
}

fn common_offset(values: &[&Value]) -> Option<FixedOffset> {
    let mut offsets = values.iter().map(|v| match v {
        Value::Timestamp(Timestamp::Aware(dt)) => Some(*dt.offset()),
        _ => None,
    });
    let first = offsets.next()??;
    offsets.all(|o| o == Some(first)).then_some(first)
}

/// Equality where NaN equals NaN, recursing into lists and maps.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|((kx, vx), (ky, vy))| kx == ky && values_equal(vx, vy))
        }
        _ => a == b,
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, casting every value to `dtype`.
    pub fn new(name: impl Into<String>, dtype: DType, values: Vec<Value>) -> Result<Self> {
        let values = values
            .iter()
            .map(|v| cast(v, dtype))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.into(),
            dtype,
            values,
        })
    }

    /// Build a column with an inferred dtype.
    pub fn infer(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = infer_dtype(&values);
        let values = match dtype {
            // Inference only picks a dtype every value already fits
            DType::Object | DType::Int64 | DType::Bool => values,
            _ => values
                .iter()
                .map(|v| cast(v, dtype).unwrap_or_else(|_| v.clone()))
                .collect(),
        };
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Re-type this column.
    pub fn astype(&self, dtype: DType) -> Result<Self> {
        Column::new(self.name.clone(), dtype, self.values.clone()).map_err(|e| match e {
            Error::Type(msg) => Error::Type(format!("column '{}': {}", self.name, msg)),
            other => other,
        })
    }
}

/// An in-memory table of rows and named, typed columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame from columns of equal length with unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::domain(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(Error::domain(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    first.len()
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Build a frame from records. Columns appear in first-seen order and
    /// attributes a record lacks become `Null`.
    pub fn from_records(records: &[Record]) -> Self {
        let mut names: Vec<&str> = Vec::new();
        let mut seen = HashSet::new();
        for record in records {
            for name in record.keys() {
                if seen.insert(name.as_str()) {
                    names.push(name);
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values = records
                    .iter()
                    .map(|r| r.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                Column::infer(name, values)
            })
            .collect();

        Self { columns }
    }

    /// [`Frame::from_records`] followed by [`Frame::astype`].
    pub fn from_records_with_dtypes(records: &[Record], dtypes: &DTypeMap) -> Result<Self> {
        Self::from_records(records).astype(dtypes)
    }

    /// Re-type the named columns, leaving the rest untouched.
    pub fn astype(&self, dtypes: &DTypeMap) -> Result<Self> {
        if let Some(missing) = dtypes.keys().find(|name| self.column(name).is_none()) {
            return Err(Error::domain(format!(
                "only a column name can be used for the key in a dtype mapping; '{}' not found",
                missing
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| match dtypes.get(&c.name) {
                Some(dtype) => c.astype(*dtype),
                None => Ok(c.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn dtypes(&self) -> Vec<(&str, DType)> {
        self.columns.iter().map(|c| (c.name.as_str(), c.dtype)).collect()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Extract one row as a record.
    pub fn row(&self, index: usize) -> Option<Record> {
        if index >= self.height() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[index].clone()))
                .collect(),
        )
    }

    /// Every row as a record, missing markers included.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.height()).filter_map(|i| self.row(i)).collect()
    }

    /// Frame equality where NaN equals NaN in the same position.
    pub fn equals(&self, other: &Frame) -> bool {
        self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.name == b.name
                    && a.dtype == b.dtype
                    && a.len() == b.len()
                    && a.values.iter().zip(&b.values).all(|(x, y)| values_equal(x, y))
            })
    }
}

/// Input accepted by [`to_record`]: a single-row frame or one extracted row.
#[derive(Debug, Clone)]
pub enum RowSource<'a> {
    Frame(&'a Frame),
    Row(Record),
}

impl<'a> From<&'a Frame> for RowSource<'a> {
    fn from(frame: &'a Frame) -> Self {
        RowSource::Frame(frame)
    }
}

impl From<Record> for RowSource<'_> {
    fn from(row: Record) -> Self {
        RowSource::Row(row)
    }
}

/// Convert a single-row frame or one extracted row to a record.
pub fn to_record<'a>(source: impl Into<RowSource<'a>>) -> Result<Record> {
    match source.into() {
        RowSource::Row(row) => Ok(row),
        RowSource::Frame(frame) => {
            if frame.height() != 1 {
                return Err(Error::domain(
                    "obj must be a single row frame. Use the to_records function to \
                     convert a multi row frame.",
                ));
            }
            frame
                .row(0)
                .ok_or_else(|| Error::domain("obj must be a single row frame"))
        }
    }
}
