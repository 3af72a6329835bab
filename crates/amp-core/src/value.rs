//! Semi-structured document values.
//!
//! Dashboard user records are loosely typed: the same key may hold a bare
//! string in one schema generation and a list of records in the next. A
//! [`Document`] maps field names to [`Value`]s, a tagged variant that the
//! projection rules match on directly. A missing key is simply absent from
//! the map.
//!
//! # JSON encoding
//!
//! Timestamps and object ids use the document-store extended-JSON wrappers
//! `{"$date": "<RFC 3339>"}` and `{"$oid": "<24 hex>"}`. Every other variant
//! maps to the natural JSON type.

use std::collections::{BTreeMap, btree_map};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

use crate::{Error, ObjectId, Result};

const DATE_KEY: &str = "$date";
const OID_KEY: &str = "$oid";

// ─── Value ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Timestamp(DateTime<Utc>),
  ObjectId(ObjectId),
  Array(Vec<Value>),
  Document(Document),
}

impl Value {
  /// Whether the value counts as "present" for the set/unset decision.
  ///
  /// `null`, `false`, zero, and empty strings, arrays, and documents are
  /// falsy; timestamps and object ids are always truthy.
  pub fn is_truthy(&self) -> bool {
    match self {
      Self::Null => false,
      Self::Bool(b) => *b,
      Self::Int(i) => *i != 0,
      Self::Float(f) => *f != 0.0,
      Self::String(s) => !s.is_empty(),
      Self::Timestamp(_) | Self::ObjectId(_) => true,
      Self::Array(items) => !items.is_empty(),
      Self::Document(doc) => !doc.is_empty(),
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Value]> {
    match self {
      Self::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_document(&self) -> Option<&Document> {
    match self {
      Self::Document(doc) => Some(doc),
      _ => None,
    }
  }

  pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Timestamp(ts) => Some(*ts),
      _ => None,
    }
  }

  /// Short name of the variant, for diagnostics.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Bool(_) => "bool",
      Self::Int(_) => "int",
      Self::Float(_) => "float",
      Self::String(_) => "string",
      Self::Timestamp(_) => "timestamp",
      Self::ObjectId(_) => "object id",
      Self::Array(_) => "array",
      Self::Document(_) => "document",
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self { Self::Int(i) }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Self::String(s.to_string()) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Self::String(s) }
}

impl From<DateTime<Utc>> for Value {
  fn from(ts: DateTime<Utc>) -> Self { Self::Timestamp(ts) }
}

impl From<ObjectId> for Value {
  fn from(id: ObjectId) -> Self { Self::ObjectId(id) }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Self { Self::Array(items) }
}

impl From<Document> for Value {
  fn from(doc: Document) -> Self { Self::Document(doc) }
}

// ─── JSON conversion ─────────────────────────────────────────────────────────

impl TryFrom<serde_json::Value> for Value {
  type Error = Error;

  fn try_from(json: serde_json::Value) -> Result<Self> {
    use serde_json::Value as Json;

    Ok(match json {
      Json::Null => Self::Null,
      Json::Bool(b) => Self::Bool(b),
      Json::Number(n) => match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => Self::Int(i),
        (None, Some(f)) if !n.is_u64() => Self::Float(f),
        _ => return Err(Error::IntegerOutOfRange(n.to_string())),
      },
      Json::String(s) => Self::String(s),
      Json::Array(items) => Self::Array(
        items
          .into_iter()
          .map(Value::try_from)
          .collect::<Result<_>>()?,
      ),
      Json::Object(map) => {
        if let Some(wrapped) = unwrap_extended(&map) {
          return wrapped;
        }
        Self::Document(Document::try_from(map)?)
      }
    })
  }
}

/// Recognise the single-key `$date` / `$oid` wrappers.
fn unwrap_extended(map: &Map<String, serde_json::Value>) -> Option<Result<Value>> {
  if map.len() != 1 {
    return None;
  }
  let (key, inner) = map.iter().next()?;
  let text = inner.as_str()?;
  match key.as_str() {
    DATE_KEY => Some(
      DateTime::parse_from_rfc3339(text)
        .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
        .map_err(|e| Error::InvalidTimestamp {
          value:  text.to_string(),
          reason: e.to_string(),
        }),
    ),
    OID_KEY => Some(ObjectId::parse(text).map(Value::ObjectId)),
    _ => None,
  }
}

impl From<Value> for serde_json::Value {
  fn from(value: Value) -> Self {
    use serde_json::Value as Json;

    match value {
      Value::Null => Json::Null,
      Value::Bool(b) => Json::Bool(b),
      Value::Int(i) => Json::Number(i.into()),
      Value::Float(f) => Number::from_f64(f).map_or(Json::Null, Json::Number),
      Value::String(s) => Json::String(s),
      Value::Timestamp(ts) => serde_json::json!({
        DATE_KEY: ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
      }),
      Value::ObjectId(id) => serde_json::json!({ OID_KEY: id.to_hex() }),
      Value::Array(items) => {
        Json::Array(items.into_iter().map(Json::from).collect())
      }
      Value::Document(doc) => doc.into(),
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// An ordered mapping of field name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct Document(BTreeMap<String, Value>);

impl Document {
  /// Key under which the store keeps a document's own id.
  pub const ID_KEY: &'static str = "_id";

  pub fn new() -> Self { Self::default() }

  /// Parse a JSON object into a document.
  pub fn from_json(json: serde_json::Value) -> Result<Self> {
    Self::try_from(json)
  }

  pub fn from_json_str(s: &str) -> Result<Self> {
    Self::from_json(serde_json::from_str(s)?)
  }

  pub fn to_json(&self) -> serde_json::Value { self.clone().into() }

  pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

  pub fn contains_key(&self, key: &str) -> bool { self.0.contains_key(key) }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    self.0.insert(key.into(), value.into())
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// The `_id` field, if present and well-formed.
  pub fn id(&self) -> Option<ObjectId> {
    match self.get(Self::ID_KEY) {
      Some(Value::ObjectId(id)) => Some(*id),
      Some(Value::String(s)) => ObjectId::parse(s).ok(),
      _ => None,
    }
  }
}

impl TryFrom<Map<String, serde_json::Value>> for Document {
  type Error = Error;

  fn try_from(map: Map<String, serde_json::Value>) -> Result<Self> {
    map
      .into_iter()
      .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
      .collect()
  }
}

impl TryFrom<serde_json::Value> for Document {
  type Error = Error;

  fn try_from(json: serde_json::Value) -> Result<Self> {
    match json {
      serde_json::Value::Object(map) => Self::try_from(map),
      other => Err(Error::NotADocument(json_kind(&other))),
    }
  }
}

impl From<Document> for serde_json::Value {
  fn from(doc: Document) -> Self {
    serde_json::Value::Object(
      doc
        .0
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::from(v)))
        .collect(),
    )
  }
}

impl FromIterator<(String, Value)> for Document {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for Document {
  type Item = (String, Value);
  type IntoIter = btree_map::IntoIter<String, Value>;

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a> IntoIterator for &'a Document {
  type Item = (&'a String, &'a Value);
  type IntoIter = btree_map::Iter<'a, String, Value>;

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
  match json {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "bool",
    serde_json::Value::Number(_) => "number",
    serde_json::Value::String(_) => "string",
    serde_json::Value::Array(_) => "array",
    serde_json::Value::Object(_) => "object",
  }
}
