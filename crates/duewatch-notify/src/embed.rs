//! Discord webhook payload for a reminder batch.

use chrono::{DateTime, Duration, Local, SecondsFormat, Utc};
use chrono_tz::Tz;
use duewatch_core::assignment::Assignment;
use serde::Serialize;

/// Embed side-bar colour (yellow).
pub const REMINDER_COLOR: u32 = 16_776_960;

// Discord rejects embeds past any of these limits, counted in characters.
const MAX_FIELDS: usize = 25;
const MAX_FIELD_NAME: usize = 256;
const MAX_FIELD_VALUE: usize = 1024;
const MAX_EMBED_CHARS: usize = 6000;

/// Space held back for the "…and N more" field.
const SUMMARY_RESERVE: usize = 100;

const DUE_FORMAT: &str = "%b %-d, %Y at %-I:%M %p";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  pub embeds:  Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
  pub title:       String,
  pub description: String,
  pub color:       u32,
  pub fields:      Vec<EmbedField>,
  /// RFC 3339.
  pub timestamp:   String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub footer:      Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
  pub name:   String,
  pub value:  String,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
  pub text: String,
}

/// Build the single-embed message announcing `assignments`.
///
/// Due times are rendered in `zone`, or the host zone when `None`.
pub fn reminder_payload(
  assignments: &[Assignment],
  now:         DateTime<Utc>,
  window:      Duration,
  zone:        Option<Tz>,
) -> WebhookPayload {
  let mut embed = Embed {
    title:       "⚠️ Assignment Reminders".into(),
    description: format!(
      "You have **{}** assignment(s) due within {} hours!",
      assignments.len(),
      window.num_hours()
    ),
    color:       REMINDER_COLOR,
    fields:      Vec::new(),
    timestamp:   now.to_rfc3339_opts(SecondsFormat::Secs, true),
    footer:      Some(EmbedFooter { text: "duewatch".into() }),
  };

  let all: Vec<EmbedField> = assignments
    .iter()
    .map(|a| reminder_field(a, now, zone))
    .collect();
  let fixed = embed_len(&embed);
  let total = fixed + all.iter().map(field_len).sum::<usize>();

  if all.len() <= MAX_FIELDS && total <= MAX_EMBED_CHARS {
    embed.fields = all;
  } else {
    let budget = MAX_EMBED_CHARS.saturating_sub(fixed + SUMMARY_RESERVE);
    let mut used = 0;
    for field in all {
      let len = field_len(&field);
      if embed.fields.len() == MAX_FIELDS - 1 || used + len > budget {
        break;
      }
      used += len;
      embed.fields.push(field);
    }

    let hidden = assignments.len() - embed.fields.len();
    embed.fields.push(EmbedField {
      name:   format!("…and {hidden} more"),
      value:  "Open Classroom for the full list.".into(),
      inline: false,
    });
  }

  WebhookPayload { content: None, embeds: vec![embed] }
}

fn reminder_field(a: &Assignment, now: DateTime<Utc>, zone: Option<Tz>) -> EmbedField {
  let value = format!(
    "**Course:** {}\n**Due:** {}\n**Time Left:** {}",
    truncate(&a.course_name, MAX_FIELD_NAME),
    format_due(a.due_time, zone),
    time_left(a.due_time - now),
  );
  EmbedField {
    name:   truncate(&a.title, MAX_FIELD_NAME),
    value:  truncate(&value, MAX_FIELD_VALUE),
    inline: false,
  }
}

fn field_len(field: &EmbedField) -> usize {
  field.name.chars().count() + field.value.chars().count()
}

/// Characters Discord counts towards the embed total.
fn embed_len(embed: &Embed) -> usize {
  embed.title.chars().count()
    + embed.description.chars().count()
    + embed.footer.as_ref().map_or(0, |f| f.text.chars().count())
    + embed.fields.iter().map(field_len).sum::<usize>()
}

fn format_due(due: DateTime<Utc>, zone: Option<Tz>) -> String {
  match zone {
    Some(tz) => due.with_timezone(&tz).format(DUE_FORMAT).to_string(),
    None => due.with_timezone(&Local).format(DUE_FORMAT).to_string(),
  }
}

fn time_left(left: Duration) -> String {
  let left = left.max(Duration::zero());
  format!("{}h {}m", left.num_hours(), left.num_minutes() % 60)
}

fn truncate(s: &str, max_chars: usize) -> String {
  match s.char_indices().nth(max_chars) {
    Some((idx, _)) => s[..idx].to_owned(),
    None => s.to_owned(),
  }
}
