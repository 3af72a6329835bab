//! The plugin context the attribute manager threads through its calls.

use amp_core::{Clock, SystemClock, UpdateDescriptor, UserId, UserSource};
use amp_store_sqlite::SqliteUserDb;

use crate::{
  Error, Result, config::PluginConfig, projector::Projector, rules::RuleSet,
};

/// Open the configured dashboard store and pick the rule set in force now.
pub async fn plugin_init(config: &PluginConfig) -> Result<PluginContext<SqliteUserDb>> {
  let store = SqliteUserDb::open(&config.store_uri)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(PluginContext::new(config, store))
}

/// A source store reader paired with the projector chosen at initialisation.
pub struct PluginContext<S, C = SystemClock> {
  source:    S,
  projector: Projector<C>,
}

impl<S: UserSource> PluginContext<S> {
  pub fn new(config: &PluginConfig, source: S) -> Self {
    Self::with_clock(config, source, SystemClock)
  }
}

impl<S: UserSource, C: Clock> PluginContext<S, C> {
  /// Like [`PluginContext::new`], reading both the cutover decision and
  /// termination stamps from `clock`.
  pub fn with_clock(config: &PluginConfig, source: S, clock: C) -> Self {
    let generation = config.select_generation(clock.now());
    tracing::info!(%generation, "selected dashboard schema rules");
    let projector = Projector::with_clock(RuleSet::for_generation(generation), clock);
    Self { source, projector }
  }

  pub fn source(&self) -> &S { &self.source }

  pub fn projector(&self) -> &Projector<C> { &self.projector }

  /// Read `user_id` from the dashboard store and project it.
  ///
  /// A missing user is reported as [`Error::UserNotFound`]; store failures
  /// are passed through untouched.
  pub async fn project(&self, user_id: UserId) -> Result<UpdateDescriptor> {
    tracing::debug!(%user_id, "fetching dashboard user");
    let document = self
      .source
      .get_user_by_id(user_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
      .ok_or(Error::UserNotFound(user_id))?;

    self.projector.project(&document).map_err(|e| match e {
      Error::UnknownFields { user_id: None, fields } => {
        Error::UnknownFields { user_id: Some(user_id), fields }
      }
      other => other,
    })
  }
}
