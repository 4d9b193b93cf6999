//! Tabular value model.
//!
//! A [`Value`] is one cell of a [`Frame`](crate::frame::Frame) or one attribute of
//! a [`Record`]. It carries enough type information to pick a DynamoDB wire tag
//! on write. Values read back from the store only ever use `Null`, `Int`, `Float`,
//! `Str`, `Bool`, `Binary`, `List` and `Map`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{Error, Result};

/// One item's attributes, keyed by attribute name.
pub type Record = BTreeMap<String, Value>;

const SECONDS_PER_DAY: i64 = 86_400;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent attribute, `None`, or a nullable-integer NA.
    Null,
    /// Missing timestamp or duration.
    NaT,
    Int(i64),
    /// May hold NaN, which is the float column's missing marker.
    Float(f64),
    Bool(bool),
    Str(String),
    Timestamp(Timestamp),
    Duration(TimeDelta),
    Binary(Vec<u8>),
    List(Vec<Value>),
    Map(Record),
}

impl Value {
    /// True for every member of the null-like family: `Null`, `NaT` and NaN floats.
    pub fn is_null_like(&self) -> bool {
        match self {
            Value::Null | Value::NaT => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::NaT => "NaT",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
            Value::Binary(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Map(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(Timestamp::Naive(v))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(Timestamp::Aware(v))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(Timestamp::Aware(v.fixed_offset()))
    }
}

impl From<TimeDelta> for Value {
    fn from(v: TimeDelta) -> Self {
        Value::Duration(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A point in time, with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Parse the canonical text form, also accepting a bare date or a `T` separator.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(Timestamp::Aware(dt));
            }
        }
        for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Timestamp::Naive(dt));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Timestamp::Naive(date.and_time(chrono::NaiveTime::MIN)));
        }
        Err(Error::type_error(format!("cannot parse '{}' as a timestamp", s)))
    }

    /// Re-express this timestamp at the given offset. Naive values are taken as UTC.
    pub fn with_offset(self, offset: FixedOffset) -> Self {
        match self {
            Timestamp::Naive(dt) => Timestamp::Aware(dt.and_utc().with_timezone(&offset)),
            Timestamp::Aware(dt) => Timestamp::Aware(dt.with_timezone(&offset)),
        }
    }

    /// Drop the offset, keeping the wall-clock time.
    pub fn naive(self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(dt) => dt,
            Timestamp::Aware(dt) => dt.naive_local(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let naive = self.naive();
        write!(f, "{}", naive.format("%Y-%m-%d %H:%M:%S"))?;
        write_fraction(f, naive.nanosecond())?;
        if let Timestamp::Aware(dt) = self {
            write!(f, "{}", dt.format("%:z"))?;
        }
        Ok(())
    }
}

/// Microsecond precision when that is exact, nanoseconds otherwise, nothing for zero.
fn write_fraction(f: &mut fmt::Formatter<'_>, nanos: u32) -> fmt::Result {
    if nanos == 0 {
        Ok(())
    } else if nanos % 1_000 == 0 {
        write!(f, ".{:06}", nanos / 1_000)
    } else {
        write!(f, ".{:09}", nanos)
    }
}

/// Canonical duration text: `"{days} days HH:MM:SS"`.
///
/// Days are floored, so negative durations read `"-1 days +23:59:59"`.
pub fn format_duration(d: &TimeDelta) -> String {
    struct Rendered(TimeDelta);

    impl fmt::Display for Rendered {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut secs = self.0.num_seconds();
            let mut nanos = i64::from(self.0.subsec_nanos());
            if nanos < 0 {
                secs -= 1;
                nanos += NANOS_PER_SECOND;
            }
            let days = secs.div_euclid(SECONDS_PER_DAY);
            let clock = secs.rem_euclid(SECONDS_PER_DAY);
            let sign = if days < 0 { "+" } else { "" };
            write!(
                f,
                "{} days {}{:02}:{:02}:{:02}",
                days,
                sign,
                clock / 3_600,
                (clock % 3_600) / 60,
                clock % 60
            )?;
            write_fraction(f, nanos as u32)
        }
    }

    Rendered(*d).to_string()
}

/// Inverse of [`format_duration`].
pub fn parse_duration(s: &str) -> Result<TimeDelta> {
    let bad = || Error::type_error(format!("cannot parse '{}' as a duration", s));

    let (days, clock) = s.trim().split_once(" days ").ok_or_else(bad)?;
    let days: i64 = days.trim().parse().map_err(|_| bad())?;
    let clock = clock.trim().trim_start_matches('+');

    let mut parts = clock.splitn(3, ':');
    let hours: i64 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let minutes: i64 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let seconds = parts.next().ok_or_else(bad)?;

    let (whole, frac) = seconds.split_once('.').unwrap_or((seconds, ""));
    let whole: i64 = whole.parse().map_err(|_| bad())?;
    let nanos: i64 = if frac.is_empty() {
        0
    } else if frac.len() <= 9 && frac.bytes().all(|b| b.is_ascii_digit()) {
        format!("{:0<9}", frac).parse().map_err(|_| bad())?
    } else {
        return Err(bad());
    };

    let total = days * SECONDS_PER_DAY + hours * 3_600 + minutes * 60 + whole;
    Ok(TimeDelta::seconds(total) + TimeDelta::nanoseconds(nanos))
}
