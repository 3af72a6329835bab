//! Dashboard attribute-manager plugin.
//!
//! Reads a user from the dashboard user collection and produces the
//! `$set` / `$unset` update the attribute manager applies to the central
//! user record. Only allow-listed fields propagate; a document carrying any
//! other key is rejected outright.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ctx = amp_dashboard::plugin_init(&config).await?;
//! let update = ctx.project(user_id).await?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod normalize;
pub mod projector;
pub mod rules;

pub use config::PluginConfig;
pub use context::{PluginContext, plugin_init};
pub use error::{Error, Result};
pub use projector::Projector;
pub use rules::{RuleSet, SchemaGeneration};
