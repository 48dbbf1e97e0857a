//! Scheduler configuration: the raw deserialised form and the validated
//! settings the scheduler runs with.

use std::time::Duration as StdDuration;

use chrono::Duration;
use duewatch_core::notification::NotificationKind;
use serde::Deserialize;

use crate::{ConfigError, WakeHour, WallClock};

/// Longest accepted look-ahead window: two weeks.
pub const MAX_LOOKAHEAD_HOURS: u32 = 14 * 24;

/// Scheduler section of the server configuration. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  /// Local hour of day (`0..=23`) at which the daily cycle runs.
  pub wake_hour:         u32,
  /// How far ahead of the wake instant a due time still qualifies.
  pub lookahead_hours:   u32,
  pub notification_kind: NotificationKind,
  /// Upper bound on each classroom fetch and each dispatch.
  pub call_timeout_secs: u64,
  /// IANA zone name; the host zone when unset.
  pub timezone:          Option<String>,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      wake_hour:         18,
      lookahead_hours:   6,
      notification_kind: NotificationKind::default(),
      call_timeout_secs: 30,
      timezone:          None,
    }
  }
}

impl SchedulerConfig {
  /// Validate and convert into [`SchedulerSettings`].
  pub fn resolve(&self) -> Result<SchedulerSettings, ConfigError> {
    if self.lookahead_hours == 0 {
      return Err(ConfigError::EmptyLookahead);
    }
    if self.lookahead_hours > MAX_LOOKAHEAD_HOURS {
      return Err(ConfigError::LookaheadTooLong {
        hours: self.lookahead_hours,
        max:   MAX_LOOKAHEAD_HOURS,
      });
    }
    if self.call_timeout_secs == 0 {
      return Err(ConfigError::EmptyCallTimeout);
    }

    Ok(SchedulerSettings {
      wake_hour:    WakeHour::new(self.wake_hour)?,
      lookahead:    Duration::hours(i64::from(self.lookahead_hours)),
      kind:         self.notification_kind.clone(),
      call_timeout: StdDuration::from_secs(self.call_timeout_secs),
      clock:        WallClock::from_name(self.timezone.as_deref())?,
    })
  }
}

/// Validated scheduler parameters.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
  pub wake_hour:    WakeHour,
  pub lookahead:    Duration,
  pub kind:         NotificationKind,
  pub call_timeout: StdDuration,
  pub clock:        WallClock,
}
