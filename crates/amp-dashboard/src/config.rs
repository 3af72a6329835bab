//! Plugin configuration and rule-set selection.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::rules::SchemaGeneration;

/// Attribute-manager settings for this plugin, deserialised by the host
/// (see `amp-cli`) from a TOML file layered with `AMP_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
  /// Location of the dashboard user store.
  pub store_uri:     PathBuf,
  /// Switch to the current schema from this UTC date onwards.
  #[serde(default)]
  pub new_user_date: Option<NaiveDate>,
  /// Pin a schema generation; takes precedence over `new_user_date`.
  #[serde(default)]
  pub schema:        Option<SchemaGeneration>,
}

impl PluginConfig {
  pub fn new(store_uri: impl Into<PathBuf>) -> Self {
    Self { store_uri: store_uri.into(), new_user_date: None, schema: None }
  }

  /// The generation in force at `now`.
  pub fn select_generation(&self, now: DateTime<Utc>) -> SchemaGeneration {
    if let Some(schema) = self.schema {
      return schema;
    }
    match self.new_user_date {
      Some(cutover) if now.date_naive() < cutover => SchemaGeneration::Legacy,
      _ => SchemaGeneration::Current,
    }
  }
}
