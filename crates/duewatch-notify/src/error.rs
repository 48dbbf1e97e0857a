//! Error types for `duewatch-notify`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("webhook request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("webhook returned {status}: {body}")]
  Status {
    status: reqwest::StatusCode,
    body:   String,
  },

  #[error("refusing to send an empty reminder batch")]
  EmptyBatch,

  #[error("discord.webhook_url is missing or empty")]
  MissingWebhook,

  #[error("invalid webhook URL: {0}")]
  Url(#[from] url::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
