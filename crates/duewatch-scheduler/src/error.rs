//! Error types for `duewatch-scheduler`.

use std::fmt;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejected scheduler configuration. Raised at startup only.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("wake hour must be between 0 and 23, got {0}")]
  WakeHour(u32),

  #[error("look-ahead window must be at least one hour")]
  EmptyLookahead,

  #[error("look-ahead window must be at most {max} hours, got {hours}")]
  LookaheadTooLong { hours: u32, max: u32 },

  #[error("call timeout must be at least one second")]
  EmptyCallTimeout,

  #[error("unknown time zone {0:?}")]
  UnknownTimeZone(String),
}

/// A failure that abandons the whole cycle.
#[derive(Debug, Error)]
pub enum CycleError {
  #[error("could not list credentials: {0}")]
  ListCredentials(#[source] BoxError),
}

// ─── Per-user failures ───────────────────────────────────────────────────────

/// Where in the per-user sequence a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
  Fetch,
  Filter,
  Dispatch,
  Record,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Fetch => "fetch",
      Self::Filter => "filter",
      Self::Dispatch => "dispatch",
      Self::Record => "record",
    })
  }
}

/// A failure isolated to one user; the cycle moves on to the next one.
#[derive(Debug, Error)]
pub(crate) enum UserFailure {
  #[error("{stage} failed: {source}")]
  Call {
    stage:  Stage,
    #[source]
    source: BoxError,
  },

  #[error("{stage} timed out")]
  TimedOut { stage: Stage },
}

impl UserFailure {
  pub(crate) fn call(stage: Stage, source: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Call { stage, source: Box::new(source) }
  }

  pub(crate) fn stage(&self) -> Stage {
    match self {
      Self::Call { stage, .. } | Self::TimedOut { stage } => *stage,
    }
  }
}
