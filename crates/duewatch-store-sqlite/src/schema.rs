//! SQL schema for the duewatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

-- One row per signed-in account. Written only by the login flow.
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    google_id     TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    name          TEXT NOT NULL,
    access_token  TEXT,
    refresh_token TEXT NOT NULL DEFAULT '',
    token_expiry  TEXT NOT NULL,   -- RFC 3339 UTC
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- The dedup ledger. Rows are insert-only; no UPDATE or DELETE is issued.
CREATE TABLE IF NOT EXISTS notification_records (
    user_id           INTEGER NOT NULL REFERENCES users(id),
    assignment_id     TEXT NOT NULL,
    notification_kind TEXT NOT NULL,
    sent_on           TEXT NOT NULL,   -- local calendar date, YYYY-MM-DD
    recorded_at       TEXT NOT NULL,
    UNIQUE (user_id, assignment_id, notification_kind, sent_on)
);

CREATE INDEX IF NOT EXISTS notification_records_user_idx
    ON notification_records(user_id, sent_on);

PRAGMA user_version = 1;
";
