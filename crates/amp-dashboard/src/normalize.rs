//! Per-field value normalizers.
//!
//! Each normalizer is a pure function from the raw field value (and, where a
//! rule needs it, the rest of the document or the clock) to the value that
//! should propagate. Returning `None` means "nothing to propagate"; the
//! projector then decides between unset and omit. Malformed input degrades
//! to `None` or to a dropped entry, never to an error.

use amp_core::{Clock, Document, Value};
use chrono::{DateTime, Utc};

/// Everything a normalizer may look at besides its own field.
pub struct RuleContext<'a> {
  pub document: &'a Document,
  clock:        &'a dyn Clock,
}

impl<'a> RuleContext<'a> {
  pub fn new(document: &'a Document, clock: &'a dyn Clock) -> Self {
    Self { document, clock }
  }

  /// Current time; only read by rules that stamp values.
  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }
}

/// Signature shared by every field normalizer.
pub type Normalizer = fn(&RuleContext<'_>, Option<&Value>) -> Option<Value>;

/// Keys under which a legacy identity-number record may carry its value.
const NIN_VALUE_KEYS: [&str; 3] = ["norEduPersonNIN", "nin", "number"];

// ─── Generic ─────────────────────────────────────────────────────────────────

/// Propagate the stored value unchanged.
pub fn passthrough(_: &RuleContext<'_>, value: Option<&Value>) -> Option<Value> {
  value.cloned()
}

/// A field that must never be set, whatever it holds.
pub fn retired(_: &RuleContext<'_>, _: Option<&Value>) -> Option<Value> { None }

// ─── Identity numbers ────────────────────────────────────────────────────────

/// Reduce a legacy identity-number list to the bare values of its verified
/// entries, in their original order.
///
/// Records count as verified only when `verified` is the boolean `true`.
/// Bare strings predate per-entry verification; only verified numbers were
/// ever stored that way, so they are kept.
pub fn verified_nins(_: &RuleContext<'_>, value: Option<&Value>) -> Option<Value> {
  let entries = value?.as_array()?;
  let verified = entries
    .iter()
    .filter_map(verified_nin)
    .map(|nin| Value::String(nin.to_string()))
    .collect();
  Some(Value::Array(verified))
}

fn verified_nin(entry: &Value) -> Option<&str> {
  match entry {
    Value::String(nin) if !nin.is_empty() => Some(nin.as_str()),
    Value::Document(record) => {
      if record.get("verified") != Some(&Value::Bool(true)) {
        return None;
      }
      NIN_VALUE_KEYS
        .iter()
        .filter_map(|key| record.get(key).and_then(Value::as_str))
        .find(|nin| !nin.is_empty())
    }
    _ => None,
  }
}

// ─── Contact methods ─────────────────────────────────────────────────────────

/// `mailAliases`, with the first alias promoted to primary when none is.
pub fn mail_aliases(_: &RuleContext<'_>, value: Option<&Value>) -> Option<Value> {
  let aliases = value?.as_array()?;
  Some(Value::Array(with_default_primary(aliases)))
}

/// A `phone` or legacy `mobile` list, with a default primary entry.
pub fn phone_numbers(_: &RuleContext<'_>, value: Option<&Value>) -> Option<Value> {
  let numbers = value?.as_array()?;
  Some(Value::Array(with_default_primary(numbers)))
}

/// `phone` when the document has usable phone data; otherwise the legacy
/// `mobile` list reshaped into `phone` records. A malformed `phone` counts as
/// absent.
pub fn phone_or_mobile(ctx: &RuleContext<'_>, value: Option<&Value>) -> Option<Value> {
  if let Some(phone) = phone_numbers(ctx, value).filter(Value::is_truthy) {
    return Some(phone);
  }
  let mobiles = ctx.document.get("mobile")?.as_array()?;
  Some(Value::Array(with_default_primary(&remap_mobiles(mobiles))))
}

/// Rename `mobile` → `number` in each legacy entry, keeping `verified` and
/// `primary`. Entries without a usable number are dropped.
pub fn remap_mobiles(entries: &[Value]) -> Vec<Value> {
  entries
    .iter()
    .filter_map(Value::as_document)
    .filter_map(|entry| {
      let number = entry.get("mobile").and_then(Value::as_str)?;
      if number.is_empty() {
        return None;
      }
      let mut phone = Document::new();
      phone.insert("number", number);
      phone.insert(
        "verified",
        entry.get("verified").and_then(Value::as_bool).unwrap_or(false),
      );
      if let Some(primary) = entry.get("primary").and_then(Value::as_bool) {
        phone.insert("primary", primary);
      }
      Some(Value::Document(phone))
    })
    .collect()
}

/// Clone `entries`, marking the first record `primary: true` when no record
/// already is.
pub fn with_default_primary(entries: &[Value]) -> Vec<Value> {
  let mut out = entries.to_vec();
  let has_primary = out.iter().any(|entry| {
    entry
      .as_document()
      .and_then(|doc| doc.get("primary"))
      .and_then(Value::as_bool)
      .unwrap_or(false)
  });
  if has_primary {
    return out;
  }
  if let Some(Value::Document(first)) =
    out.iter_mut().find(|entry| matches!(entry, Value::Document(_)))
  {
    first.insert("primary", true);
  }
  out
}

// ─── Termination ─────────────────────────────────────────────────────────────

/// `true` becomes the current time; a timestamp is kept; anything else,
/// including `false`, propagates nothing.
pub fn termination(ctx: &RuleContext<'_>, value: Option<&Value>) -> Option<Value> {
  match value? {
    Value::Bool(true) => Some(Value::Timestamp(ctx.now())),
    Value::Timestamp(ts) => Some(Value::Timestamp(*ts)),
    _ => None,
  }
}
