//! [`DiscordDispatcher`], the webhook implementation of
//! [`NotificationDispatcher`].

use std::{fmt, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use duewatch_core::{UserId, assignment::Assignment, remote::NotificationDispatcher};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{Error, Result, reminder_payload};

/// Webhook target. The URL embeds the webhook token, so it is never logged.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
  pub webhook_url: String,
}

impl fmt::Debug for DiscordConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DiscordConfig")
      .field("webhook_url", &"<redacted>")
      .finish()
  }
}

impl DiscordConfig {
  pub fn validate(&self) -> Result<Url> {
    let url = self.webhook_url.trim();
    if url.is_empty() {
      return Err(Error::MissingWebhook);
    }
    Ok(Url::parse(url)?)
  }
}

/// Posts one embed per batch to a single Discord channel.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct DiscordDispatcher {
  http:    Client,
  webhook: Url,
  window:  Duration,
  zone:    Option<Tz>,
}

impl fmt::Debug for DiscordDispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DiscordDispatcher")
      .field("window", &self.window)
      .field("zone", &self.zone)
      .finish_non_exhaustive()
  }
}

impl DiscordDispatcher {
  /// `window` is the look-ahead span quoted in the message text.
  pub fn new(config: &DiscordConfig, window: Duration) -> Result<Self> {
    let webhook = config.validate()?;
    let http = Client::builder()
      .timeout(StdDuration::from_secs(30))
      .build()?;
    Ok(Self { http, webhook, window, zone: None })
  }

  /// Render due times in `zone` instead of the host zone.
  pub fn with_display_zone(mut self, zone: Option<Tz>) -> Self {
    self.zone = zone;
    self
  }
}

impl NotificationDispatcher for DiscordDispatcher {
  type Error = Error;

  async fn send(&self, user_id: UserId, assignments: &[Assignment]) -> Result<()> {
    if assignments.is_empty() {
      return Err(Error::EmptyBatch);
    }

    let payload = reminder_payload(assignments, Utc::now(), self.window, self.zone);
    let resp = self
      .http
      .post(self.webhook.clone())
      .json(&payload)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Status { status, body });
    }

    tracing::info!(user_id, count = assignments.len(), %status, "sent discord notification");
    Ok(())
  }
}
