//! [`Projector`] turns one raw dashboard document into an update
//! descriptor for the central user record.

use std::collections::BTreeSet;

use amp_core::{Clock, Document, SystemClock, UpdateDescriptor, Value};

use crate::{
  Error, Result,
  normalize::RuleContext,
  rules::{FieldRule, RuleSet, SchemaGeneration, UnsetPolicy},
};

/// Stateless apart from its rule table and clock; safe to share between
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct Projector<C = SystemClock> {
  rules: RuleSet,
  clock: C,
}

impl Projector<SystemClock> {
  pub fn new(rules: RuleSet) -> Self { Self::with_clock(rules, SystemClock) }
}

impl<C: Clock> Projector<C> {
  pub fn with_clock(rules: RuleSet, clock: C) -> Self { Self { rules, clock } }

  pub fn rules(&self) -> &RuleSet { &self.rules }

  pub fn generation(&self) -> SchemaGeneration { self.rules.generation() }

  /// Project `document` onto the allow-listed fields.
  ///
  /// Every rule's normalized value is computed first, so that paired unset
  /// policies can see their partner's outcome. Truthy values are set; empty
  /// ones are unset or omitted according to the rule.
  pub fn project(&self, document: &Document) -> Result<UpdateDescriptor> {
    self.reject_unknown_fields(document)?;

    let ctx = RuleContext::new(document, &self.clock);
    let projected: Vec<(&FieldRule, Option<Value>)> = self
      .rules
      .rules()
      .iter()
      .map(|rule| {
        let value = (rule.normalize)(&ctx, document.get(rule.field))
          .filter(Value::is_truthy);
        (rule, value)
      })
      .collect();

    let filled: BTreeSet<&str> = projected
      .iter()
      .filter(|(_, value)| value.is_some())
      .map(|(rule, _)| rule.field)
      .collect();

    let mut update = UpdateDescriptor::new();
    for (rule, value) in projected {
      match (value, rule.on_empty) {
        (Some(value), _) => update.set_field(rule.field, value),
        (None, UnsetPolicy::Omit) => {}
        (None, UnsetPolicy::Unset) => update.unset_field(rule.field),
        (None, UnsetPolicy::UnsetWithPartner(partner)) => {
          if !filled.contains(partner) {
            update.unset_field(rule.field);
          }
        }
      }
    }

    tracing::debug!(
      user_id = ?document.id(),
      set = ?update.set().keys().collect::<Vec<_>>(),
      unset = ?update.unset(),
      "projected update"
    );
    Ok(update)
  }

  fn reject_unknown_fields(&self, document: &Document) -> Result<()> {
    let fields: Vec<String> = document
      .keys()
      .filter(|key| !self.rules.accepts(key))
      .map(str::to_string)
      .collect();
    if fields.is_empty() {
      return Ok(());
    }

    let user_id = document.id();
    tracing::warn!(?user_id, ?fields, "rejecting document with unknown fields");
    Err(Error::UnknownFields { user_id, fields })
  }
}

#[cfg(test)]
mod tests {
  use amp_core::FixedClock;
  use chrono::{DateTime, TimeZone, Utc};
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2016, 1, 2, 3, 4, 5).unwrap() }

  fn projector(generation: SchemaGeneration) -> Projector<FixedClock> {
    Projector::with_clock(RuleSet::for_generation(generation), FixedClock(now()))
  }

  fn project(generation: SchemaGeneration, doc: serde_json::Value) -> UpdateDescriptor {
    projector(generation)
      .project(&Document::from_json(doc).unwrap())
      .unwrap()
  }

  fn password() -> serde_json::Value {
    json!({
      "id": { "$oid": "112345678901234567890123" },
      "salt": "$NDNv1H1$9c810d852430b62a9a7c6159d5d64c41c3831846f81b6799b54e1e8922f11545$32$32$",
    })
  }

  // ─── Allow-list ────────────────────────────────────────────────────────────

  #[test]
  fn unknown_fields_reject_the_whole_document() {
    let doc = Document::from_json(json!({
      "_id": { "$oid": "5f0000000000000000000001" },
      "eduPersonPrincipalName": "test-test",
      "mail": "john@example.com",
      "malicious": "hacker",
      "zzz": 1,
    }))
    .unwrap();

    for generation in [SchemaGeneration::Legacy, SchemaGeneration::Current] {
      match projector(generation).project(&doc) {
        Err(Error::UnknownFields { user_id, fields }) => {
          assert_eq!(user_id, doc.id());
          assert_eq!(fields, vec!["malicious".to_string(), "zzz".to_string()]);
        }
        other => panic!("expected UnknownFields, got {other:?}"),
      }
    }
  }

  #[test]
  fn bookkeeping_fields_never_propagate() {
    let update = project(SchemaGeneration::Current, json!({
      "_id": { "$oid": "5f0000000000000000000001" },
      "eduPersonPrincipalName": "test-test",
      "modified_ts": { "$date": "2015-01-01T00:00:00Z" },
      "displayName": "John",
    }));
    assert_eq!(update.get("displayName"), Some(&Value::from("John")));
    for key in ["_id", "eduPersonPrincipalName", "modified_ts"] {
      assert!(update.get(key).is_none() && !update.is_unset(key));
    }
  }

  // ─── Whole-document scenarios ──────────────────────────────────────────────

  #[test]
  fn legacy_existing_user() {
    let update = project(SchemaGeneration::Legacy, json!({
      "eduPersonPrincipalName": "test-test",
      "mail": "john@example.com",
      "mailAliases": [{
        "email": "john@example.com",
        "verified": true,
        "added_timestamp": { "$date": "2016-01-02T00:00:00Z" },
      }],
      "mobile": [{ "verified": true, "mobile": "+46700011336", "primary": true }],
      "passwords": [password()],
    }));

    assert_eq!(
      update.to_json(),
      json!({
        "$set": {
          "mail": "john@example.com",
          "mailAliases": [{
            "email": "john@example.com",
            "verified": true,
            "primary": true,
            "added_timestamp": { "$date": "2016-01-02T00:00:00Z" },
          }],
          "mobile": [{ "verified": true, "mobile": "+46700011336", "primary": true }],
          "passwords": [password()],
        },
        "$unset": {
          "norEduPersonNIN": "",
          "nins": "",
          "phone": "",
          "terminated": "",
        },
      })
    );
  }

  #[test]
  fn current_existing_user() {
    let update = project(SchemaGeneration::Current, json!({
      "eduPersonPrincipalName": "test-test",
      "mailAliases": [{
        "email": "john@example.com",
        "verified": true,
        "primary": true,
        "created_ts": { "$date": "2016-01-02T00:00:00Z" },
      }],
      "phone": [{ "verified": true, "number": "+46700011336", "primary": true }],
      "passwords": [password()],
    }));

    assert_eq!(
      update.to_json(),
      json!({
        "$set": {
          "mailAliases": [{
            "email": "john@example.com",
            "verified": true,
            "primary": true,
            "created_ts": { "$date": "2016-01-02T00:00:00Z" },
          }],
          "phone": [{ "verified": true, "number": "+46700011336", "primary": true }],
          "passwords": [password()],
        },
        "$unset": {
          "mail": "",
          "norEduPersonNIN": "",
          "nins": "",
          "terminated": "",
        },
      })
    );
  }

  #[test]
  fn changed_display_name_is_picked_up() {
    let mut raw = json!({
      "eduPersonPrincipalName": "test-test",
      "mail": "john@example.com",
      "displayName": "John",
    });
    let first = project(SchemaGeneration::Legacy, raw.clone());
    assert_eq!(first.get("displayName"), Some(&Value::from("John")));

    raw["displayName"] = json!("John2");
    let second = project(SchemaGeneration::Legacy, raw);
    assert_eq!(second.get("displayName"), Some(&Value::from("John2")));
  }

  #[test]
  fn appended_password_is_propagated_whole() {
    let mut raw = json!({ "mail": "john@example.com", "passwords": [password()] });
    let first = project(SchemaGeneration::Legacy, raw.clone());
    assert_eq!(first.get("passwords").and_then(Value::as_array).map(<[_]>::len), Some(1));

    raw["passwords"].as_array_mut().unwrap().push(json!({
      "id": { "$oid": "222222222222222222222222" },
      "salt": "456",
    }));
    let second = project(SchemaGeneration::Legacy, raw);
    assert_eq!(second.get("passwords").and_then(Value::as_array).map(<[_]>::len), Some(2));
  }

  // ─── Decision policy ───────────────────────────────────────────────────────

  #[test]
  fn no_field_is_both_set_and_unset() {
    let docs = [
      json!({}),
      json!({ "mail": "", "mailAliases": [], "terminated": false }),
      json!({ "mobile": [{ "mobile": "+4611" }], "nins": [] }),
      json!({ "phone": [{ "number": "+4611" }], "norEduPersonNIN": ["1"] }),
    ];
    for generation in [SchemaGeneration::Legacy, SchemaGeneration::Current] {
      for doc in &docs {
        let update = project(generation, doc.clone());
        for field in update.unset() {
          assert!(update.get(field).is_none(), "{field} in both maps");
        }
      }
    }
  }

  #[test]
  fn projection_is_repeatable() {
    let doc = Document::from_json(json!({
      "mail": "john@example.com",
      "terminated": true,
      "mobile": [{ "mobile": "+46700011336", "verified": true }],
    }))
    .unwrap();
    let p = projector(SchemaGeneration::Current);
    assert_eq!(p.project(&doc).unwrap(), p.project(&doc).unwrap());
  }

  #[test]
  fn empty_mail_and_aliases_are_unset() {
    for mail in [json!(""), json!(null)] {
      let update = project(SchemaGeneration::Current, json!({
        "mail": mail,
        "mailAliases": [],
      }));
      assert!(update.is_unset("mail"));
      assert!(update.is_unset("mailAliases"));
      assert!(update.get("mail").is_none() && update.get("mailAliases").is_none());
    }

    let absent = project(SchemaGeneration::Current, json!({}));
    assert!(absent.is_unset("mail") && absent.is_unset("mailAliases"));
  }

  #[test]
  fn empty_optional_fields_are_omitted() {
    let update = project(SchemaGeneration::Legacy, json!({
      "givenName": "",
      "eduPersonEntitlement": [],
      "passwords": [],
    }));
    for field in ["givenName", "eduPersonEntitlement", "passwords", "displayName"] {
      assert!(update.get(field).is_none());
      assert!(!update.is_unset(field));
    }
  }

  // ─── Identity numbers ──────────────────────────────────────────────────────

  #[test]
  fn only_verified_nins_propagate() {
    let update = project(SchemaGeneration::Legacy, json!({
      "norEduPersonNIN": [
        { "norEduPersonNIN": "123456781234", "verified": false },
        { "norEduPersonNIN": "123456781235", "verified": true },
      ],
    }));
    assert_eq!(
      update.get("norEduPersonNIN"),
      Some(&Value::Array(vec![Value::from("123456781235")]))
    );
  }

  #[test]
  fn all_unverified_nins_are_unset() {
    let update = project(SchemaGeneration::Legacy, json!({
      "norEduPersonNIN": [{ "norEduPersonNIN": "123456781234", "verified": false }],
    }));
    assert!(update.is_unset("norEduPersonNIN"));
  }

  #[test]
  fn current_nins_pass_through_unchanged() {
    let nins = json!([
      { "number": "123456781235", "verified": true, "primary": true },
      { "number": "123456781236", "verified": false, "primary": false },
    ]);
    let update = project(SchemaGeneration::Current, json!({ "nins": nins.clone() }));
    assert_eq!(update.get("nins"), Some(&Value::try_from(nins).unwrap()));
  }

  #[test]
  fn legacy_nin_unset_depends_on_generation() {
    let doc = json!({
      "norEduPersonNIN": [],
      "nins": [{ "number": "123456781235", "verified": true, "primary": true }],
    });

    let legacy = project(SchemaGeneration::Legacy, doc.clone());
    assert!(legacy.is_unset("norEduPersonNIN"));

    let current = project(SchemaGeneration::Current, doc);
    assert!(!current.is_unset("norEduPersonNIN"));
    assert!(current.get("norEduPersonNIN").is_none());
  }

  // ─── Phone numbers ─────────────────────────────────────────────────────────

  #[test]
  fn mobile_is_remapped_into_phone() {
    let update = project(SchemaGeneration::Current, json!({
      "mobile": [{ "mobile": "+46700011336", "verified": true, "primary": true }],
    }));
    assert_eq!(
      update.get("phone").cloned().map(serde_json::Value::from),
      Some(json!([{ "number": "+46700011336", "verified": true, "primary": true }]))
    );
    assert!(update.get("mobile").is_none());
    assert!(!update.is_unset("mobile"));
  }

  #[test]
  fn malformed_phone_falls_back_to_mobile() {
    let update = project(SchemaGeneration::Current, json!({
      "phone": "+4611",
      "mobile": [{ "mobile": "+46700011336", "verified": true, "primary": true }],
    }));
    assert_eq!(
      update.get("phone").cloned().map(serde_json::Value::from),
      Some(json!([{ "number": "+46700011336", "verified": true, "primary": true }]))
    );
    assert!(!update.is_unset("phone"));
    assert!(!update.is_unset("mobile"));
  }

  #[test]
  fn no_phone_data_unsets_both_shapes() {
    let update = project(SchemaGeneration::Current, json!({ "mobile": [] }));
    assert!(update.is_unset("mobile"));
    assert!(update.is_unset("phone"));
  }

  #[test]
  fn legacy_keeps_mobile_and_fills_primary() {
    let update = project(SchemaGeneration::Legacy, json!({
      "mobile": [{ "verified": true, "mobile": "+46700011336" }],
    }));
    assert_eq!(
      update.get("mobile").cloned().map(serde_json::Value::from),
      Some(json!([{ "verified": true, "mobile": "+46700011336", "primary": true }]))
    );
    assert!(update.is_unset("phone"));
  }

  #[test]
  fn legacy_empty_mobile_is_unset() {
    let update = project(SchemaGeneration::Legacy, json!({
      "mail": "test@example.com",
      "mobile": [],
      "norEduPersonNIN": ["123456781235"],
    }));
    assert!(update.is_unset("mobile"));
    assert_eq!(
      update.get("norEduPersonNIN"),
      Some(&Value::Array(vec![Value::from("123456781235")]))
    );
  }

  // ─── Termination ───────────────────────────────────────────────────────────

  #[test]
  fn terminated_flag_is_stamped_with_projection_time() {
    let update = project(SchemaGeneration::Current, json!({ "terminated": true }));
    assert_eq!(update.get("terminated"), Some(&Value::Timestamp(now())));
    assert!(!update.is_unset("terminated"));
  }

  #[test]
  fn terminated_timestamp_is_kept() {
    let update = project(SchemaGeneration::Current, json!({
      "terminated": { "$date": "2015-06-01T00:00:00Z" },
    }));
    assert_eq!(
      update.get("terminated"),
      Some(&Value::Timestamp(Utc.with_ymd_and_hms(2015, 6, 1, 0, 0, 0).unwrap()))
    );
  }

  #[test]
  fn cleared_termination_is_unset() {
    let update = project(SchemaGeneration::Legacy, json!({ "terminated": false }));
    assert!(update.is_unset("terminated"));
    assert!(update.get("terminated").is_none());
  }
}
