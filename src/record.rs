//! Generic nested status record: maps, lists and scalars, no schema.

use crate::date::{format_timestamp, from_epoch_seconds, parse_timestamp};
use anyhow::Result;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Timestamp(OffsetDateTime),
    List(Vec<Record>),
    Map(BTreeMap<String, Record>),
}

impl Record {
    /// Build a map record from `(key, value)` pairs.
    pub fn map<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Record)>,
        K: Into<String>,
    {
        Record::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Record::Text(s.into())
    }

    /// Direct child lookup; `None` unless `self` is a map holding `key`.
    pub fn get(&self, key: &str) -> Option<&Record> {
        match self {
            Record::Map(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Record::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Record]> {
        match self {
            Record::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Record::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Record::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Record::Null)
    }

    /// Interpret the value as a point in time (timestamp, parseable text, or unix seconds).
    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Record::Timestamp(t) => Some(*t),
            Record::Text(s) => parse_timestamp(s),
            Record::Number(n) => n.as_f64().and_then(from_epoch_seconds),
            _ => None,
        }
    }

    /// Render a scalar leaf as CSV text. Maps and lists render as `None`.
    pub fn render_scalar(&self) -> Result<Option<String>> {
        let s = match self {
            Record::Null => String::new(),
            Record::Bool(b) => b.to_string(),
            Record::Number(n) => n.to_string(),
            Record::Text(s) => s.clone(),
            Record::Timestamp(t) => format_timestamp(*t)?,
            Record::List(_) | Record::Map(_) => return Ok(None),
        };
        Ok(Some(s))
    }

    /// Set `key` on a map record. No-op for non-map records.
    pub fn insert(&mut self, key: impl Into<String>, value: Record) {
        if let Record::Map(m) = self {
            m.insert(key.into(), value);
        }
    }
}

impl From<Value> for Record {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Record::Null,
            Value::Bool(b) => Record::Bool(b),
            Value::Number(n) => Record::Number(n),
            Value::String(s) => Record::Text(s),
            Value::Array(items) => Record::List(items.into_iter().map(Record::from).collect()),
            Value::Object(obj) => Record::Map(obj.into_iter().map(|(k, v)| (k, Record::from(v))).collect()),
        }
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Record::Text(s.to_string())
    }
}

impl From<u64> for Record {
    fn from(n: u64) -> Self {
        Record::Number(n.into())
    }
}

impl From<i64> for Record {
    fn from(n: i64) -> Self {
        Record::Number(n.into())
    }
}

impl From<OffsetDateTime> for Record {
    fn from(t: OffsetDateTime) -> Self {
        Record::Timestamp(t)
    }
}
