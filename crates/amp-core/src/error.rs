//! Error types for `amp-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid object id {0:?}: expected 24 hex characters")]
  InvalidObjectId(String),

  #[error("invalid timestamp {value:?}: {reason}")]
  InvalidTimestamp { value: String, reason: String },

  #[error("integer {0} does not fit in a signed 64-bit value")]
  IntegerOutOfRange(String),

  #[error("expected a JSON object at the document root, got {0}")]
  NotADocument(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
