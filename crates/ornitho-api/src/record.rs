//! Raw records as received from the API, and the field decoding shared by all models
//!
//! The service sends nearly every value as a string and encodes option fields
//! either as a bare id (`"1_5"`) or as an object (`{"@id": "1_5", "#text": "..."}`).
//! [`FieldValue`] decodes both shapes once so model getters never inspect JSON types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use serde_json::{Map, Value};

use crate::error::OrnithoError;

/// One remote entity, exactly as received
pub type RawRecord = Map<String, Value>;

/// Identifier of a remote entity: numeric, or composite like `"<field>_<value>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Int(i64),
    Composite(String),
}

impl Identifier {
    /// Decode an identifier from a raw JSON value (string or number)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => s.parse().ok(),
            Value::Object(_) => FieldValue::from_value(Some(value)).id().and_then(|s| s.parse().ok()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Composite(_) => None,
        }
    }

    /// Split a composite `"<group>_<value>"` identifier
    pub fn parts(&self) -> Option<(&str, &str)> {
        match self {
            Self::Int(_) => None,
            Self::Composite(id) => id.split_once('_'),
        }
    }
}

impl FromStr for Identifier {
    type Err = OrnithoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OrnithoError::InvalidIdentifier(s.to_string()));
        }
        Ok(s.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Composite(s.to_string())))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Composite(id) => f.write_str(id),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for Identifier {
    fn from(id: i32) -> Self {
        Self::Int(id as i64)
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Self::Int(id as i64)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        id.parse().unwrap_or_else(|_| Self::Composite(id.to_string()))
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Self::from(id.as_str())
    }
}

impl From<&Identifier> for Value {
    fn from(id: &Identifier) -> Self {
        Value::String(id.to_string())
    }
}

/// Default identifier lookup: `"@id"`, then `"id"`
pub fn default_identifier(record: &RawRecord) -> Option<Identifier> {
    record
        .get("@id")
        .and_then(Identifier::from_value)
        .or_else(|| record.get("id").and_then(Identifier::from_value))
}

/// A decoded field of a raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Plain value; numbers and booleans arrive as strings
    Scalar(&'a str),
    /// `{"@id": .., "#text": ..}` reference
    CompoundId { id: &'a str, text: Option<&'a str> },
    Missing,
}

impl<'a> FieldValue<'a> {
    pub fn from_value(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(s)) => Self::Scalar(s),
            Some(Value::Object(obj)) => match obj.get("@id").and_then(Value::as_str) {
                Some(id) => Self::CompoundId {
                    id,
                    text: obj.get("#text").and_then(Value::as_str),
                },
                None => Self::Missing,
            },
            _ => Self::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Textual value: the scalar itself, or the id of a reference
    pub fn id(&self) -> Option<&'a str> {
        match *self {
            Self::Scalar(s) => Some(s),
            Self::CompoundId { id, .. } => Some(id),
            Self::Missing => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.id()
    }

    pub fn text(&self) -> Option<&'a str> {
        match *self {
            Self::CompoundId { text, .. } => text,
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.id()?.trim().parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.id()?.trim().parse().ok()
    }

    /// Service booleans: `"0"` is false, anything else present is true
    pub fn as_bool(&self) -> Option<bool> {
        self.id().map(|s| s != "0")
    }

    /// Trailing component of a `"<group>_<value>"` id
    pub fn trailing_value(&self) -> Option<&'a str> {
        self.id()
            .map(|id| id.rsplit_once('_').map(|(_, value)| value).unwrap_or(id))
    }
}

/// Decode a field of a record
pub fn field<'a>(record: &'a RawRecord, key: &str) -> FieldValue<'a> {
    FieldValue::from_value(record.get(key))
}

/// Nested object field, e.g. `record["species"]`
pub fn object<'a>(record: &'a RawRecord, key: &str) -> Option<&'a RawRecord> {
    record.get(key).and_then(Value::as_object)
}

/// First element of an array of objects, e.g. `record["observers"][0]`
pub fn first_object<'a>(record: &'a RawRecord, key: &str) -> Option<&'a RawRecord> {
    record
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
}

/// Decode a unix timestamp stored either bare or as `{"@timestamp": ..}`
pub fn timestamp(record: &RawRecord, key: &str) -> Option<DateTime<Local>> {
    let secs: i64 = match record.get(key)? {
        Value::Object(obj) => obj.get("@timestamp").and_then(as_i64)?,
        other => as_i64(other)?,
    };
    Local.timestamp_opt(secs, 0).single()
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
