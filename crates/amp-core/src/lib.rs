//! Core types and trait definitions for the dashboard attribute-manager
//! plugin.
//!
//! This crate is deliberately free of database and CLI dependencies. The
//! plugin crate and the store backends depend on it; it depends on nothing
//! proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod error;
pub mod object_id;
pub mod source;
pub mod update;
pub mod value;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use object_id::{ObjectId, UserId};
pub use source::UserSource;
pub use update::UpdateDescriptor;
pub use value::{Document, Value};
