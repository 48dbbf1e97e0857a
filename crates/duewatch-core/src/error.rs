//! Error types for `duewatch-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("notification kind must be a non-empty label, got {0:?}")]
  InvalidNotificationKind(String),

  #[error("due window ends ({end}) before it starts ({start})")]
  InvalidWindow {
    start: DateTime<Utc>,
    end:   DateTime<Utc>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
