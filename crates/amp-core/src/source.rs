//! The `UserSource` trait: read access to the dashboard user collection.
//!
//! Implemented by storage backends (e.g. `amp-store-sqlite`). The plugin
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{object_id::UserId, value::Document};

/// Abstraction over the store holding raw dashboard user documents.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait UserSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve the raw document stored under `id`. Returns `None` if no such
  /// user exists; the caller decides how to surface that.
  fn get_user_by_id(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;
}
