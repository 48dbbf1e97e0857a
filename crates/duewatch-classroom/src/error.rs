//! Error types for `duewatch-classroom`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{endpoint} returned {status}: {body}")]
  Status {
    endpoint: String,
    status:   reqwest::StatusCode,
    body:     String,
  },

  #[error("coursework {id} has an impossible due date or time")]
  InvalidDueDate { id: String },

  #[error("invalid URL: {0}")]
  Url(#[from] url::ParseError),

  #[error("OAuth setting `{0}` is missing or empty")]
  MissingSetting(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
