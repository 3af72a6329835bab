//! [`SqliteUserDb`]: the SQLite implementation of [`UserSource`].

use std::path::Path;

use amp_core::{Document, ObjectId, UserId, UserSource, Value};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{Error, Result, schema::SCHEMA};

/// Key stamped with the time of the last save.
const MODIFIED_KEY: &str = "modified_ts";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A dashboard user collection backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteUserDb {
  conn: tokio_rusqlite::Connection,
}

impl SqliteUserDb {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or replace a user document and return its id.
  ///
  /// A document without `_id` is assigned a fresh one. `modified_ts` is
  /// always overwritten with the current time. The document content is not
  /// validated; rejecting unknown fields is the reader's job.
  pub async fn save(&self, mut document: Document) -> Result<UserId> {
    let now = Utc::now();
    let user_id = match document.get(Document::ID_KEY) {
      None => ObjectId::generate(now),
      Some(Value::ObjectId(id)) => *id,
      Some(Value::String(s)) => ObjectId::parse(s)?,
      Some(other) => return Err(Error::InvalidDocumentId(other.kind())),
    };

    document.insert(Document::ID_KEY, user_id);
    document.insert(MODIFIED_KEY, now);

    let id_str = user_id.to_hex();
    let doc_str = document.to_json().to_string();
    let at_str = now.to_rfc3339();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO dashboard_users (user_id, document, modified_ts)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE SET
             document    = excluded.document,
             modified_ts = excluded.modified_ts",
          rusqlite::params![id_str, doc_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(%user_id, "saved dashboard user");
    Ok(user_id)
  }

  /// Ids of every stored user, in ascending order.
  pub async fn list_user_ids(&self) -> Result<Vec<UserId>> {
    let raws: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT user_id FROM dashboard_users ORDER BY user_id")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| {
        ObjectId::parse(&raw).map_err(|e| Error::CorruptRow {
          user_id: raw.clone(),
          reason:  e.to_string(),
        })
      })
      .collect()
  }

  /// Remove a user; returns whether a row was deleted.
  pub async fn remove(&self, id: UserId) -> Result<bool> {
    let id_str = id.to_hex();
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM dashboard_users WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

// ─── UserSource impl ─────────────────────────────────────────────────────────

impl UserSource for SqliteUserDb {
  type Error = Error;

  async fn get_user_by_id(&self, id: UserId) -> Result<Option<Document>> {
    let id_str = id.to_hex();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT document FROM dashboard_users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw
      .as_deref()
      .map(Document::from_json_str)
      .transpose()
      .map_err(Error::from)
  }
}
