//! Google OAuth 2.0 authorization-code flow.
//!
//! Only the pieces the login routes need: building the consent URL,
//! exchanging the returned code for tokens, and reading the account's
//! identity. Token refresh is not implemented; expired users sign in again.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result, check_status, http_client};

/// Scopes requested at consent time.
pub const SCOPES: &[&str] = &[
  "https://www.googleapis.com/auth/userinfo.profile",
  "https://www.googleapis.com/auth/userinfo.email",
  "https://www.googleapis.com/auth/classroom.courses.readonly",
  "https://www.googleapis.com/auth/classroom.coursework.me.readonly",
  "openid",
];

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Used when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ─── Config ──────────────────────────────────────────────────────────────────

/// OAuth client registration. Endpoint URLs default to Google's.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
  pub client_id:     String,
  pub client_secret: String,
  pub redirect_url:  String,
  pub auth_url:      String,
  pub token_url:     String,
  pub userinfo_url:  String,
}

impl Default for OAuthConfig {
  fn default() -> Self {
    Self {
      client_id:     String::new(),
      client_secret: String::new(),
      redirect_url:  String::new(),
      auth_url:      AUTH_URL.into(),
      token_url:     TOKEN_URL.into(),
      userinfo_url:  USERINFO_URL.into(),
    }
  }
}

impl fmt::Debug for OAuthConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OAuthConfig")
      .field("client_id", &self.client_id)
      .field("client_secret", &"<redacted>")
      .field("redirect_url", &self.redirect_url)
      .field("auth_url", &self.auth_url)
      .field("token_url", &self.token_url)
      .field("userinfo_url", &self.userinfo_url)
      .finish()
  }
}

impl OAuthConfig {
  /// Reject a registration with any required field blank or an endpoint that
  /// is not an absolute URL.
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("google.client_id", &self.client_id),
      ("google.client_secret", &self.client_secret),
      ("google.redirect_url", &self.redirect_url),
    ];
    for (name, value) in required {
      if value.trim().is_empty() {
        return Err(Error::MissingSetting(name));
      }
    }
    for endpoint in [&self.auth_url, &self.token_url, &self.userinfo_url] {
      Url::parse(endpoint)?;
    }
    Ok(())
  }
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
  access_token:  String,
  #[serde(default)]
  refresh_token: Option<String>,
  #[serde(default)]
  expires_in:    Option<i64>,
}

/// Tokens issued by a successful code exchange.
#[derive(Clone)]
pub struct TokenGrant {
  pub access_token:  String,
  /// Empty when the provider did not issue one (repeat consent).
  pub refresh_token: String,
  pub expiry:        DateTime<Utc>,
}

impl fmt::Debug for TokenGrant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenGrant")
      .field("access_token", &"<redacted>")
      .field("refresh_token", &"<redacted>")
      .field("expiry", &self.expiry)
      .finish()
  }
}

/// The signed-in account, from the user-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
  pub id:    String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub name:  String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Performs the HTTP side of the login flow.
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
  http:   Client,
  config: OAuthConfig,
}

impl GoogleOAuth {
  pub fn new(config: OAuthConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { http: http_client()?, config })
  }

  pub fn config(&self) -> &OAuthConfig { &self.config }

  /// The consent page URL, requesting offline access so a refresh token is
  /// issued on first consent.
  pub fn authorize_url(&self, state: &str) -> Result<Url> {
    let scope = SCOPES.join(" ");
    Ok(Url::parse_with_params(&self.config.auth_url, [
      ("client_id", self.config.client_id.as_str()),
      ("redirect_uri", self.config.redirect_url.as_str()),
      ("response_type", "code"),
      ("scope", scope.as_str()),
      ("access_type", "offline"),
      ("state", state),
    ])?)
  }

  /// Exchange an authorization code for tokens.
  pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
    let resp = self
      .http
      .post(&self.config.token_url)
      .form(&[
        ("code", code),
        ("client_id", self.config.client_id.as_str()),
        ("client_secret", self.config.client_secret.as_str()),
        ("redirect_uri", self.config.redirect_url.as_str()),
        ("grant_type", "authorization_code"),
      ])
      .send()
      .await?;

    let token: TokenResponse = check_status("token exchange", resp).await?.json().await?;
    let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

    Ok(TokenGrant {
      access_token:  token.access_token,
      refresh_token: token.refresh_token.unwrap_or_default(),
      expiry:        Utc::now() + Duration::seconds(lifetime),
    })
  }

  /// Look up the account the access token belongs to.
  pub async fn user_info(&self, access_token: &str) -> Result<UserInfo> {
    let resp = self
      .http
      .get(&self.config.userinfo_url)
      .bearer_auth(access_token)
      .send()
      .await?;
    Ok(check_status("userinfo", resp).await?.json().await?)
  }
}
