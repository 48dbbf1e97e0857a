//! Wall-clock wake-time arithmetic.
//!
//! The next wake instant is always rebuilt from the current local calendar
//! date and the target hour. Adding a fixed 24 hours to the previous wake
//! would drift by an hour across every DST transition.

use chrono::{DateTime, Days, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ConfigError;

/// A validated hour of the day (`0..=23`) at which the scheduler wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeHour(NaiveTime);

impl WakeHour {
  pub fn new(hour: u32) -> Result<Self, ConfigError> {
    NaiveTime::from_hms_opt(hour, 0, 0)
      .map(Self)
      .ok_or(ConfigError::WakeHour(hour))
  }

  pub fn time(&self) -> NaiveTime { self.0 }
}

/// The next instant at or after `now` whose wall-clock time in `now`'s zone is
/// `hour:00:00`.
///
/// When that wall-clock time falls in a DST gap, the first valid instant after
/// the gap is returned; when it is ambiguous, the earlier of the two.
pub fn next_wake_instant<Z: TimeZone>(now: &DateTime<Z>, hour: WakeHour) -> DateTime<Z> {
  let zone  = now.timezone();
  let today = now.date_naive();

  let candidate = wall_clock_instant(&zone, today, hour);
  if candidate >= *now {
    return candidate;
  }

  let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
  wall_clock_instant(&zone, tomorrow, hour)
}

/// Resolve `date` at `hour` in `zone`, stepping forward minute by minute out
/// of a DST gap.
fn wall_clock_instant<Z: TimeZone>(zone: &Z, date: NaiveDate, hour: WakeHour) -> DateTime<Z> {
  let target = date.and_time(hour.time());

  for minutes in 0..=24 * 60 {
    let local = target + Duration::minutes(minutes);
    if let Some(instant) = zone.from_local_datetime(&local).earliest() {
      return instant;
    }
  }

  // No zone has a gap longer than a day; treat the wall-clock time as UTC.
  zone.from_utc_datetime(&target)
}

// ─── Zone selection ──────────────────────────────────────────────────────────

/// Which zone "local wall-clock time" refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallClock {
  /// The host's configured zone.
  System,
  /// An explicit IANA zone.
  Zone(Tz),
}

impl WallClock {
  pub fn from_name(name: Option<&str>) -> Result<Self, ConfigError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
      None => Ok(Self::System),
      Some(name) => name
        .parse::<Tz>()
        .map(Self::Zone)
        .map_err(|_| ConfigError::UnknownTimeZone(name.to_owned())),
    }
  }

  /// The next wake instant after `now`, expressed in UTC.
  pub fn next_wake(&self, now: DateTime<Utc>, hour: WakeHour) -> DateTime<Utc> {
    match self {
      Self::System => next_wake_instant(&now.with_timezone(&Local), hour).with_timezone(&Utc),
      Self::Zone(tz) => next_wake_instant(&now.with_timezone(tz), hour).with_timezone(&Utc),
    }
  }

  /// The local calendar date of `now`; the ledger's notion of "today".
  pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
    match self {
      Self::System => now.with_timezone(&Local).date_naive(),
      Self::Zone(tz) => now.with_timezone(tz).date_naive(),
    }
  }
}
