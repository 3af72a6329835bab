//! Document-store object ids.
//!
//! An object id is 12 bytes: a big-endian 4-byte creation time in seconds
//! followed by 8 bytes of entropy. Its textual form is 24 lowercase hex
//! characters.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId([u8; ObjectId::LEN]);

/// Dashboard users are keyed by their object id.
pub type UserId = ObjectId;

impl ObjectId {
  pub const LEN: usize = 12;

  pub const fn bytes(&self) -> [u8; Self::LEN] { self.0 }

  /// Parse the 24-character hex form.
  pub fn parse(s: &str) -> Result<Self> {
    let mut bytes = [0u8; Self::LEN];
    hex::decode_to_slice(s, &mut bytes)
      .map_err(|_| Error::InvalidObjectId(s.to_string()))?;
    Ok(Self(bytes))
  }

  /// A fresh id stamped with `at`.
  pub fn generate(at: DateTime<Utc>) -> Self {
    let secs = u32::try_from(at.timestamp()).unwrap_or(0);
    let mut bytes = [0u8; Self::LEN];
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    OsRng.fill_bytes(&mut bytes[4..]);
    Self(bytes)
  }

  /// The creation time embedded in the id, at second precision.
  pub fn timestamp(&self) -> DateTime<Utc> {
    let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
    DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_default()
  }

  pub fn to_hex(&self) -> String { hex::encode(self.0) }
}

impl fmt::Display for ObjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_hex())
  }
}

impl fmt::Debug for ObjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ObjectId({})", self.to_hex())
  }
}

impl FromStr for ObjectId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for ObjectId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<ObjectId> for String {
  fn from(id: ObjectId) -> Self { id.to_hex() }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn parses_and_displays_hex() {
    let id: ObjectId = "112345678901234567890123".parse().unwrap();
    assert_eq!(id.to_string(), "112345678901234567890123");
    assert_eq!(id.bytes()[0], 0x11);
  }

  #[test]
  fn uppercase_hex_is_accepted_and_normalised() {
    let id = ObjectId::parse("AABBCCDDEEFF001122334455").unwrap();
    assert_eq!(id.to_hex(), "aabbccddeeff001122334455");
  }

  #[test]
  fn rejects_wrong_length_and_non_hex() {
    assert!(ObjectId::parse("1234").is_err());
    assert!(ObjectId::parse("zz2345678901234567890123").is_err());
    assert!(ObjectId::parse("1123456789012345678901234").is_err());
  }

  #[test]
  fn generated_id_embeds_creation_time() {
    let at = Utc.with_ymd_and_hms(2015, 3, 1, 12, 30, 0).unwrap();
    let a = ObjectId::generate(at);
    let b = ObjectId::generate(at);
    assert_eq!(a.timestamp(), at);
    assert_ne!(a, b, "entropy bytes should differ");
  }

  #[test]
  fn serde_uses_hex_string() {
    let id = ObjectId::parse("0123456789abcdef01234567").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"0123456789abcdef01234567\"");
    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
  }
}
