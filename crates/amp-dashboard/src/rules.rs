//! Field rules and the two schema-generation rule sets.
//!
//! A [`RuleSet`] is the allow-list: every field it has a rule for may
//! propagate, and every other key (apart from internal bookkeeping) causes
//! the whole document to be rejected. Each rule pairs a normalizer with the
//! policy applied when the normalized value turns out empty.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::normalize::{
  Normalizer, mail_aliases, passthrough, phone_numbers, phone_or_mobile, retired,
  termination, verified_nins,
};

/// Keys the store maintains for itself; accepted but never propagated.
pub const BOOKKEEPING_FIELDS: [&str; 3] =
  ["_id", "eduPersonPrincipalName", "modified_ts"];

// ─── Schema generation ───────────────────────────────────────────────────────

/// Which generation of the dashboard schema the central store expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaGeneration {
  /// `mobile` and `phone` propagate side by side.
  Legacy,
  /// `mobile` is folded into `phone` and retired.
  Current,
}

impl std::fmt::Display for SchemaGeneration {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Legacy => "legacy",
      Self::Current => "current",
    })
  }
}

impl std::str::FromStr for SchemaGeneration {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "legacy" => Ok(Self::Legacy),
      "current" => Ok(Self::Current),
      other => Err(format!("unknown schema generation: {other:?}")),
    }
  }
}

// ─── Field rule ──────────────────────────────────────────────────────────────

/// What to do with a field whose normalized value is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsetPolicy {
  /// Leave the destination alone.
  Omit,
  /// Remove the field from the destination.
  Unset,
  /// Remove the field only if the named partner field is empty too.
  UnsetWithPartner(&'static str),
}

#[derive(Clone, Copy)]
pub struct FieldRule {
  pub field:     &'static str,
  pub normalize: Normalizer,
  pub on_empty:  UnsetPolicy,
}

impl FieldRule {
  pub fn new(field: &'static str, normalize: Normalizer, on_empty: UnsetPolicy) -> Self {
    Self { field, normalize, on_empty }
  }

  fn keep(field: &'static str) -> Self { Self::new(field, passthrough, UnsetPolicy::Omit) }
}

impl std::fmt::Debug for FieldRule {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FieldRule")
      .field("field", &self.field)
      .field("on_empty", &self.on_empty)
      .finish_non_exhaustive()
  }
}

// ─── Rule sets ───────────────────────────────────────────────────────────────

/// The immutable rule table a projector runs with.
#[derive(Debug, Clone)]
pub struct RuleSet {
  generation: SchemaGeneration,
  rules:      Vec<FieldRule>,
  allowed:    BTreeSet<&'static str>,
}

impl RuleSet {
  pub fn for_generation(generation: SchemaGeneration) -> Self {
    match generation {
      SchemaGeneration::Legacy => Self::legacy(),
      SchemaGeneration::Current => Self::current(),
    }
  }

  /// Rules for central stores that still carry `mobile`.
  pub fn legacy() -> Self {
    use UnsetPolicy::*;
    Self::from_rules(SchemaGeneration::Legacy, vec![
      FieldRule::keep("givenName"),
      FieldRule::keep("surname"),
      FieldRule::keep("sn"),
      FieldRule::keep("displayName"),
      FieldRule::keep("preferredLanguage"),
      FieldRule::new("mail", passthrough, Unset),
      FieldRule::new("norEduPersonNIN", verified_nins, Unset),
      FieldRule::new("nins", passthrough, Unset),
      FieldRule::keep("eduPersonEntitlement"),
      FieldRule::new("phone", phone_numbers, Unset),
      FieldRule::new("mobile", phone_numbers, Unset),
      FieldRule::new("mailAliases", mail_aliases, Unset),
      FieldRule::keep("passwords"),
      FieldRule::keep("letter_proofing_data"),
      FieldRule::new("terminated", termination, Unset),
    ])
  }

  /// Rules for central stores that only know `phone` and `nins`.
  pub fn current() -> Self {
    use UnsetPolicy::*;
    Self::from_rules(SchemaGeneration::Current, vec![
      FieldRule::keep("givenName"),
      FieldRule::keep("surname"),
      FieldRule::keep("sn"),
      FieldRule::keep("displayName"),
      FieldRule::keep("preferredLanguage"),
      FieldRule::new("mail", passthrough, Unset),
      FieldRule::new("norEduPersonNIN", verified_nins, UnsetWithPartner("nins")),
      FieldRule::new("nins", passthrough, Unset),
      FieldRule::keep("eduPersonEntitlement"),
      FieldRule::new("phone", phone_or_mobile, Unset),
      FieldRule::new("mobile", retired, UnsetWithPartner("phone")),
      FieldRule::new("mailAliases", mail_aliases, Unset),
      FieldRule::keep("passwords"),
      FieldRule::keep("letter_proofing_data"),
      FieldRule::new("terminated", termination, Unset),
    ])
  }

  fn from_rules(generation: SchemaGeneration, rules: Vec<FieldRule>) -> Self {
    let allowed = rules.iter().map(|r| r.field).collect();
    Self { generation, rules, allowed }
  }

  /// Replace the rule for `rule.field`, or append it (extending the
  /// allow-list) if the field had none.
  pub fn with_rule(mut self, rule: FieldRule) -> Self {
    match self.rules.iter_mut().find(|r| r.field == rule.field) {
      Some(existing) => *existing = rule,
      None => {
        self.allowed.insert(rule.field);
        self.rules.push(rule);
      }
    }
    self
  }

  pub fn generation(&self) -> SchemaGeneration { self.generation }

  pub fn rules(&self) -> &[FieldRule] { &self.rules }

  pub fn rule(&self, field: &str) -> Option<&FieldRule> {
    self.rules.iter().find(|r| r.field == field)
  }

  /// Whether `key` may appear in a source document.
  pub fn accepts(&self, key: &str) -> bool {
    self.allowed.contains(key) || BOOKKEEPING_FIELDS.contains(&key)
  }
}
