//! Error type for `amp-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] amp_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("document _id must be an object id, got {0}")]
  InvalidDocumentId(&'static str),

  /// A row whose stored id column does not parse.
  #[error("corrupt row {user_id:?}: {reason}")]
  CorruptRow { user_id: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
