//! Error type for `amp-dashboard`.

use amp_core::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(UserId),

  /// The document carries keys outside the allow-list. Nothing may be
  /// applied for this user.
  #[error("document has unknown fields: {}", fields.join(", "))]
  UnknownFields {
    user_id: Option<UserId>,
    fields:  Vec<String>,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
