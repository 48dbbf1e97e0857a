//! The reminder scheduling and notification dedup engine.
//!
//! [`ReminderScheduler`] wakes once a day at a fixed local wall-clock hour,
//! walks every stored credential, pulls the assignments due inside the
//! look-ahead window, drops the ones the ledger says were already sent today,
//! dispatches the rest as one batch per user, and records each successful
//! batch back into the ledger.
//!
//! # Usage
//!
//! ```rust,ignore
//! let settings  = SchedulerConfig::default().resolve()?;
//! let scheduler = ReminderScheduler::new(settings, store.clone(), classroom, store, discord);
//! let cancel    = CancellationToken::new();
//! tokio::spawn(scheduler.run(cancel.child_token()));
//! ```

mod config;
mod error;
mod scheduler;
mod wake;

pub use config::{MAX_LOOKAHEAD_HOURS, SchedulerConfig, SchedulerSettings};
pub use error::{ConfigError, CycleError};
pub use scheduler::{CycleReport, ReminderScheduler};
pub use wake::{WakeHour, WallClock, next_wake_instant};
