//! SQL schema for the dashboard user store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS dashboard_users (
    user_id      TEXT PRIMARY KEY,  -- 24 hex characters
    document     TEXT NOT NULL,     -- extended JSON, includes _id
    modified_ts  TEXT NOT NULL      -- RFC 3339 UTC; store-assigned
);

CREATE INDEX IF NOT EXISTS dashboard_users_modified_idx
    ON dashboard_users(modified_ts);

PRAGMA user_version = 1;
";
