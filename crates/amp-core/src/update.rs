//! The partial-update document handed back to the attribute manager.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::value::Value;

/// Value written for each removed field; the destination ignores it.
pub const UNSET_MARKER: &str = "";

/// Which fields to assign and which to remove in the central user record.
///
/// A field is never in both maps: assigning a field removes it from the
/// unset set and vice versa.
///
/// Serialises as `{"$set": {...}, "$unset": {...}}`; `$unset` is omitted when
/// nothing is removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDescriptor {
  set:   BTreeMap<String, Value>,
  unset: BTreeSet<String>,
}

impl UpdateDescriptor {
  pub fn new() -> Self { Self::default() }

  pub fn set_field(&mut self, field: impl Into<String>, value: Value) {
    let field = field.into();
    self.unset.remove(&field);
    self.set.insert(field, value);
  }

  pub fn unset_field(&mut self, field: impl Into<String>) {
    let field = field.into();
    self.set.remove(&field);
    self.unset.insert(field);
  }

  pub fn set(&self) -> &BTreeMap<String, Value> { &self.set }

  pub fn unset(&self) -> &BTreeSet<String> { &self.unset }

  pub fn get(&self, field: &str) -> Option<&Value> { self.set.get(field) }

  pub fn is_unset(&self, field: &str) -> bool { self.unset.contains(field) }

  pub fn to_json(&self) -> serde_json::Value {
    let set = self
      .set
      .iter()
      .map(|(k, v)| (k.clone(), serde_json::Value::from(v.clone())))
      .collect::<serde_json::Map<_, _>>();

    let mut out = serde_json::Map::new();
    out.insert("$set".to_string(), serde_json::Value::Object(set));
    if !self.unset.is_empty() {
      let unset = self
        .unset
        .iter()
        .map(|k| (k.clone(), serde_json::Value::from(UNSET_MARKER)))
        .collect();
      out.insert("$unset".to_string(), serde_json::Value::Object(unset));
    }
    serde_json::Value::Object(out)
  }
}

impl Serialize for UpdateDescriptor {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_json().serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn set_and_unset_are_exclusive() {
    let mut update = UpdateDescriptor::new();
    update.unset_field("mail");
    update.set_field("mail", Value::from("a@example.com"));
    assert!(!update.is_unset("mail"));
    assert_eq!(update.get("mail"), Some(&Value::from("a@example.com")));

    update.unset_field("mail");
    assert!(update.is_unset("mail"));
    assert!(update.get("mail").is_none());
  }

  #[test]
  fn wire_shape_omits_empty_unset() {
    let mut update = UpdateDescriptor::new();
    update.set_field("displayName", Value::from("John"));
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      json!({ "$set": { "displayName": "John" } })
    );

    update.unset_field("phone");
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      json!({
        "$set": { "displayName": "John" },
        "$unset": { "phone": "" },
      })
    );
  }
}
