//! SQLite backend for duewatch: stored credentials and the notification
//! ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The same [`SqliteStore`] is shared by
//! the login flow (writer of credentials) and the reminder scheduler (reader
//! of credentials, writer of ledger rows).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
