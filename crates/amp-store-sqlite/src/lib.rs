//! SQLite backend for the dashboard user collection.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Documents are stored as extended-JSON
//! text keyed by their object id.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteUserDb;
