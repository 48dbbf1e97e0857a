//! Outbound reminder delivery over a Discord webhook.

mod discord;
mod embed;
pub mod error;

pub use discord::{DiscordConfig, DiscordDispatcher};
pub use embed::{Embed, EmbedField, EmbedFooter, WebhookPayload, reminder_payload};
pub use error::{Error, Result};
