//! Wire encoding of request parameters and JSON bodies
//!
//! Dates go out as `dd.mm.yyyy` in local time. Timezone-aware values are converted
//! to the local zone first, naive values are sent as they are. The only endpoints
//! that honour a time of day are the diff queries, which take [`iso_local`] instead.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde_json::{Map, Number, Value};

use crate::record::{Identifier, RawRecord};

const DATE_FORMAT: &str = "%d.%m.%Y";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    ZonedDateTime(DateTime<FixedOffset>),
    /// Pre-built JSON, passed through untouched
    Json(Value),
}

impl ParamValue {
    /// Query-string representation
    pub fn to_query(&self) -> String {
        match self {
            Self::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::DateTime(dt) => dt.format(DATE_FORMAT).to_string(),
            Self::ZonedDateTime(dt) => to_local(dt).format(DATE_FORMAT).to_string(),
            Self::Json(Value::String(s)) => s.clone(),
            Self::Json(value) => value.to_string(),
        }
    }

    /// JSON body representation; only dates are rewritten
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
            Self::Date(_) | Self::DateTime(_) | Self::ZonedDateTime(_) => {
                Value::String(self.to_query())
            }
            Self::Json(value) => value.clone(),
        }
    }
}

/// Local wall-clock ISO-8601 timestamp with whole seconds
pub fn iso_local(value: &ParamValue) -> Option<String> {
    let naive = match value {
        ParamValue::Date(d) => d.and_hms_opt(0, 0, 0)?,
        ParamValue::DateTime(dt) => *dt,
        ParamValue::ZonedDateTime(dt) => to_local(dt),
        _ => return None,
    };
    Some(naive.with_nanosecond(0)?.format(ISO_FORMAT).to_string())
}

fn to_local(dt: &DateTime<FixedOffset>) -> NaiveDateTime {
    dt.with_timezone(&Local).naive_local()
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for ParamValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::ZonedDateTime(value.fixed_offset())
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<RawRecord> for ParamValue {
    fn from(value: RawRecord) -> Self {
        Self::Json(Value::Object(value))
    }
}

impl From<&Identifier> for ParamValue {
    fn from(value: &Identifier) -> Self {
        match value {
            Identifier::Int(id) => Self::Int(*id),
            Identifier::Composite(id) => Self::Text(id.clone()),
        }
    }
}

/// Ordered parameter list; later inserts replace earlier values of the same key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encoded `(name, value)` pairs for the query string
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0.iter().map(|(k, v)| (k.clone(), v.to_query())).collect()
    }

    /// Encoded JSON object for a request body
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
