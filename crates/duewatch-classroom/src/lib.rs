//! Google Classroom and Google OAuth over REST.
//!
//! [`ClassroomClient`] implements [`AssignmentSource`] by listing a user's
//! active courses and their coursework. [`GoogleOAuth`] covers the login
//! flow: the consent URL, the code exchange and the user-info lookup.
//!
//! [`AssignmentSource`]: duewatch_core::remote::AssignmentSource

mod client;
pub mod error;
mod oauth;
mod wire;

pub use client::ClassroomClient;
pub use error::{Error, Result};
pub use oauth::{GoogleOAuth, OAuthConfig, SCOPES, TokenGrant, UserInfo};

use std::time::Duration;

/// Shared HTTP client settings for every Google endpoint.
pub(crate) fn http_client() -> Result<reqwest::Client> {
  Ok(
    reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?,
  )
}

/// Turn a non-success response into [`Error::Status`], keeping the body.
pub(crate) async fn check_status(
  endpoint: &str,
  resp: reqwest::Response,
) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::Status { endpoint: endpoint.to_owned(), status, body })
}
