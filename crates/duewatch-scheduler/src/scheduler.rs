//! [`ReminderScheduler`]: the daily cycle and the loop that drives it.
//!
//! Lifecycle: `Idle → Sleeping(wake) → RunningCycle → Sleeping(next wake) → …`
//! until the cancellation token fires. The sleep is the only point that waits
//! on time; cancellation is also observed between users, so a user's
//! check/dispatch/record sequence is never cut in half.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use duewatch_core::{
  UserId,
  assignment::{Assignment, DueWindow},
  credential::Credential,
  remote::{AssignmentSource, NotificationDispatcher},
  store::{CredentialStore, NotificationLedger},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
  CycleError, SchedulerSettings,
  error::{Stage, UserFailure},
};

// ─── Report ──────────────────────────────────────────────────────────────────

/// Counters for one cycle; logged when the cycle ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
  /// Credentials returned by the store.
  pub users:                usize,
  pub skipped_expired:      usize,
  /// Users whose fetch, filter, dispatch or record step failed.
  pub failed:               usize,
  /// Batches the dispatcher accepted, including any whose ledger write then
  /// failed; such a user is also counted in `failed`.
  pub batches_sent:         usize,
  pub assignments_notified: usize,
  /// Shutdown was requested before every user was processed.
  pub interrupted:          bool,
}

enum UserOutcome {
  NothingDue,
  AlreadyNotified,
  Notified(usize),
  /// Delivered, but at least one ledger write failed.
  NotifiedUnrecorded(usize, UserFailure),
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Drives one reminder cycle per day at the configured local hour.
pub struct ReminderScheduler<C, A, L, D> {
  settings:    SchedulerSettings,
  credentials: C,
  source:      A,
  ledger:      L,
  dispatcher:  D,
}

impl<C, A, L, D> ReminderScheduler<C, A, L, D>
where
  C: CredentialStore,
  A: AssignmentSource,
  L: NotificationLedger,
  D: NotificationDispatcher,
{
  pub fn new(
    settings:    SchedulerSettings,
    credentials: C,
    source:      A,
    ledger:      L,
    dispatcher:  D,
  ) -> Self {
    Self { settings, credentials, source, ledger, dispatcher }
  }

  pub fn settings(&self) -> &SchedulerSettings { &self.settings }

  /// Sleep until each wake instant and run a cycle, until `cancel` fires.
  ///
  /// Cycle failures are logged and never end the loop; the next wake retries
  /// from scratch.
  pub async fn run(self, cancel: CancellationToken) {
    info!(
      wake_hour = %self.settings.wake_hour.time(),
      lookahead_hours = self.settings.lookahead.num_hours(),
      kind = %self.settings.kind,
      "reminder scheduler started"
    );

    let mut last_wake: Option<DateTime<Utc>> = None;

    loop {
      let now  = Utc::now();
      let wake = self.next_wake_after(now, last_wake);
      let sleep_for = (wake - now).to_std().unwrap_or_default();

      info!(wake_at = %wake, "scheduler sleeping until next wake");

      tokio::select! {
        _ = cancel.cancelled() => {
          info!("reminder scheduler stopped");
          return;
        }
        _ = tokio::time::sleep(sleep_for) => {}
      }
      last_wake = Some(wake);

      match self.run_cycle_at(Utc::now(), &cancel).await {
        Ok(report) => info!(
          users = report.users,
          skipped_expired = report.skipped_expired,
          failed = report.failed,
          batches_sent = report.batches_sent,
          assignments_notified = report.assignments_notified,
          "reminder cycle finished"
        ),
        Err(e) => error!(error = %e, "reminder cycle abandoned"),
      }

      if cancel.is_cancelled() {
        info!("reminder scheduler stopped");
        return;
      }
    }
  }

  /// The wake instant to sleep until, given the current time and the slot
  /// that last ran.
  ///
  /// Never returns the same slot twice, even if the timer fired early and
  /// `now` is still before `last_wake`.
  fn next_wake_after(
    &self,
    now:       DateTime<Utc>,
    last_wake: Option<DateTime<Utc>>,
  ) -> DateTime<Utc> {
    let from = last_wake.map_or(now, |w| now.max(w + Duration::seconds(1)));
    self.settings.clock.next_wake(from, self.settings.wake_hour)
  }

  /// Run one cycle now, without a shutdown signal.
  pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
    self.run_cycle_at(Utc::now(), &CancellationToken::new()).await
  }

  /// Run one cycle as if the current instant were `now`.
  ///
  /// Only a failure to list credentials is returned as an error; every
  /// per-user failure is logged, counted in the report, and retried on the
  /// next cycle because nothing was recorded for it.
  pub async fn run_cycle_at(
    &self,
    now:    DateTime<Utc>,
    cancel: &CancellationToken,
  ) -> Result<CycleReport, CycleError> {
    let today = self.settings.clock.local_date(now);
    info!(%today, "reminder cycle started");

    let credentials = self
      .credentials
      .list_all()
      .await
      .map_err(|e| CycleError::ListCredentials(Box::new(e)))?;

    let mut report = CycleReport { users: credentials.len(), ..Default::default() };
    if credentials.is_empty() {
      info!("no users with stored credentials");
    }

    for (position, credential) in credentials.iter().enumerate() {
      if cancel.is_cancelled() {
        warn!(
          remaining = credentials.len() - position,
          "shutdown requested; leaving remaining users for the next run"
        );
        report.interrupted = true;
        break;
      }

      if credential.is_expired_at(now) {
        warn!(
          user_id = credential.user_id,
          google_id = %credential.google_id,
          expiry = %credential.expiry,
          "credential expired; skipping user this cycle"
        );
        report.skipped_expired += 1;
        continue;
      }

      match self.process_user(credential, now, today).await {
        Ok(UserOutcome::Notified(count)) => {
          report.batches_sent += 1;
          report.assignments_notified += count;
        }
        Ok(UserOutcome::NotifiedUnrecorded(count, failure)) => {
          report.batches_sent += 1;
          report.assignments_notified += count;
          report.failed += 1;
          warn!(
            user_id = credential.user_id,
            stage = %failure.stage(),
            error = %failure,
            "reminders sent but not fully recorded; they may be sent again"
          );
        }
        Ok(UserOutcome::NothingDue | UserOutcome::AlreadyNotified) => {}
        Err(failure) => {
          report.failed += 1;
          warn!(
            user_id = credential.user_id,
            stage = %failure.stage(),
            error = %failure,
            "user skipped this cycle"
          );
        }
      }
    }

    Ok(report)
  }

  // ── Per-user sequence ─────────────────────────────────────────────────────

  async fn process_user(
    &self,
    credential: &Credential,
    now:        DateTime<Utc>,
    today:      NaiveDate,
  ) -> Result<UserOutcome, UserFailure> {
    let user_id = credential.user_id;
    let window  = DueWindow::ahead(now, self.settings.lookahead);

    let fetched = self
      .bounded(Stage::Fetch, self.source.fetch_upcoming(credential, window))
      .await?;
    if fetched.is_empty() {
      debug!(user_id, "no assignments due within window");
      return Ok(UserOutcome::NothingDue);
    }

    let due = self.unnotified(user_id, fetched, window, today).await?;
    if due.is_empty() {
      debug!(user_id, "every due assignment was already notified today");
      return Ok(UserOutcome::AlreadyNotified);
    }

    self
      .bounded(Stage::Dispatch, self.dispatcher.send(user_id, &due))
      .await?;
    info!(user_id, count = due.len(), "reminder batch dispatched");

    // The batch was delivered; record every entry even if one insert fails so
    // that as few as possible are re-sent next cycle.
    let mut first_error = None;
    for assignment in &due {
      let recorded = self
        .ledger
        .record_notified(user_id, assignment.dedup_key(), &self.settings.kind, today)
        .await;
      if let Err(e) = recorded {
        error!(
          user_id,
          assignment_id = %assignment.assignment_id,
          error = %e,
          "dispatched reminder could not be recorded"
        );
        first_error.get_or_insert(e);
      }
    }
    if let Some(e) = first_error {
      return Ok(UserOutcome::NotifiedUnrecorded(due.len(), UserFailure::call(Stage::Record, e)));
    }

    Ok(UserOutcome::Notified(due.len()))
  }

  /// Keep assignments inside `window` with no ledger record for today, once
  /// each, in source order.
  async fn unnotified(
    &self,
    user_id: UserId,
    fetched: Vec<Assignment>,
    window:  DueWindow,
    today:   NaiveDate,
  ) -> Result<Vec<Assignment>, UserFailure> {
    let mut seen = HashSet::new();
    let mut due  = Vec::with_capacity(fetched.len());

    for assignment in fetched {
      if !window.contains(assignment.due_time) {
        debug!(
          user_id,
          assignment_id = %assignment.assignment_id,
          due = %assignment.due_time,
          "assignment outside look-ahead window; dropped"
        );
        continue;
      }
      if !seen.insert(assignment.dedup_key().to_owned()) {
        continue;
      }

      let notified = self
        .ledger
        .has_been_notified(user_id, assignment.dedup_key(), &self.settings.kind, today)
        .await
        .map_err(|e| UserFailure::call(Stage::Filter, e))?;

      if notified {
        debug!(user_id, assignment_id = %assignment.assignment_id, "already notified today");
      } else {
        due.push(assignment);
      }
    }

    Ok(due)
  }

  /// Await an external call under the configured timeout.
  async fn bounded<T, E, F>(&self, stage: Stage, call: F) -> Result<T, UserFailure>
  where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
  {
    match tokio::time::timeout(self.settings.call_timeout, call).await {
      Ok(result) => result.map_err(|e| UserFailure::call(stage, e)),
      Err(_) => Err(UserFailure::TimedOut { stage }),
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
  };

  use chrono::TimeZone;
  use duewatch_core::{credential::NewCredential, notification::NotificationKind};
  use duewatch_store_sqlite::SqliteStore;
  use tokio::{sync::Notify, time::Instant};

  use super::*;
  use crate::{SchedulerConfig, WallClock};

  #[derive(Debug, thiserror::Error)]
  #[error("{0}")]
  struct FakeError(&'static str);

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 7, 18, 0, 0).unwrap()
  }

  fn today() -> NaiveDate { now().date_naive() }

  fn assignment(id: &str, due: DateTime<Utc>) -> Assignment {
    Assignment {
      course_id:     "course-1".into(),
      course_name:   "Linear Algebra".into(),
      assignment_id: id.into(),
      title:         format!("Problem set {id}"),
      due_time:      due,
    }
  }

  // ── Fakes ─────────────────────────────────────────────────────────────────

  #[derive(Default)]
  struct SourceState {
    assignments: HashMap<UserId, Vec<Assignment>>,
    failing:     HashSet<UserId>,
    hanging:     HashSet<UserId>,
    calls:       Vec<UserId>,
    /// Tokio clock reading at each call.
    called_at:   Vec<Instant>,
    fetched:     Arc<Notify>,
  }

  /// Returns whatever was configured, without applying the window.
  #[derive(Clone, Default)]
  struct FakeSource(Arc<Mutex<SourceState>>);

  impl FakeSource {
    fn set(&self, user_id: UserId, assignments: Vec<Assignment>) {
      self.0.lock().unwrap().assignments.insert(user_id, assignments);
    }

    fn calls(&self) -> Vec<UserId> { self.0.lock().unwrap().calls.clone() }
  }

  impl AssignmentSource for FakeSource {
    type Error = FakeError;

    async fn fetch_upcoming(
      &self,
      credential: &Credential,
      _window:    DueWindow,
    ) -> Result<Vec<Assignment>, FakeError> {
      let outcome = {
        let mut state = self.0.lock().unwrap();
        state.calls.push(credential.user_id);
        state.called_at.push(Instant::now());
        state.fetched.notify_one();
        if state.hanging.contains(&credential.user_id) {
          None
        } else if state.failing.contains(&credential.user_id) {
          Some(Err(FakeError("classroom unavailable")))
        } else {
          Some(Ok(
            state.assignments.get(&credential.user_id).cloned().unwrap_or_default(),
          ))
        }
      };
      match outcome {
        Some(result) => result,
        None => std::future::pending().await,
      }
    }
  }

  #[derive(Default)]
  struct DispatchState {
    attempts:       Vec<(UserId, Vec<String>)>,
    failing:        HashSet<UserId>,
    cancel_on_send: Option<CancellationToken>,
  }

  #[derive(Clone, Default)]
  struct FakeDispatcher(Arc<Mutex<DispatchState>>);

  impl FakeDispatcher {
    fn attempts(&self) -> Vec<(UserId, Vec<String>)> {
      self.0.lock().unwrap().attempts.clone()
    }

    fn fail_for(&self, user_id: UserId, failing: bool) {
      let mut state = self.0.lock().unwrap();
      if failing {
        state.failing.insert(user_id);
      } else {
        state.failing.remove(&user_id);
      }
    }
  }

  impl NotificationDispatcher for FakeDispatcher {
    type Error = FakeError;

    async fn send(&self, user_id: UserId, assignments: &[Assignment]) -> Result<(), FakeError> {
      let mut state = self.0.lock().unwrap();
      assert!(!assignments.is_empty(), "empty batch dispatched");
      state.attempts.push((
        user_id,
        assignments.iter().map(|a| a.assignment_id.clone()).collect(),
      ));
      if let Some(token) = &state.cancel_on_send {
        token.cancel();
      }
      if state.failing.contains(&user_id) {
        return Err(FakeError("webhook rejected"));
      }
      Ok(())
    }
  }

  /// Never remembers anything and fails every write.
  struct ForgetfulLedger;

  impl NotificationLedger for ForgetfulLedger {
    type Error = FakeError;

    async fn has_been_notified(
      &self,
      _user_id:       UserId,
      _assignment_id: &str,
      _kind:          &NotificationKind,
      _on:            NaiveDate,
    ) -> Result<bool, FakeError> {
      Ok(false)
    }

    async fn record_notified(
      &self,
      _user_id:       UserId,
      _assignment_id: &str,
      _kind:          &NotificationKind,
      _on:            NaiveDate,
    ) -> Result<(), FakeError> {
      Err(FakeError("disk I/O error"))
    }
  }

  struct BrokenCredentials;

  impl CredentialStore for BrokenCredentials {
    type Error = FakeError;

    async fn list_all(&self) -> Result<Vec<Credential>, FakeError> {
      Err(FakeError("database is locked"))
    }
  }

  // ── Harness ───────────────────────────────────────────────────────────────

  fn settings() -> SchedulerSettings {
    let mut settings = SchedulerConfig {
      timezone: Some("UTC".into()),
      ..Default::default()
    }
    .resolve()
    .unwrap();
    settings.call_timeout = StdDuration::from_millis(200);
    settings
  }

  struct Harness {
    store:      SqliteStore,
    source:     FakeSource,
    dispatcher: FakeDispatcher,
    alice:      Credential,
    bob:        Credential,
    scheduler:  ReminderScheduler<SqliteStore, FakeSource, SqliteStore, FakeDispatcher>,
  }

  async fn user(store: &SqliteStore, google_id: &str, expiry: DateTime<Utc>) -> Credential {
    store
      .upsert_credential(NewCredential {
        google_id:     google_id.into(),
        email:         format!("{google_id}@example.com"),
        name:          google_id.into(),
        access_token:  format!("token-{google_id}"),
        refresh_token: String::new(),
        expiry,
      })
      .await
      .unwrap()
  }

  async fn harness() -> Harness {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let alice = user(&store, "alice", now() + Duration::hours(1)).await;
    let bob   = user(&store, "bob", now() + Duration::hours(1)).await;

    let source     = FakeSource::default();
    let dispatcher = FakeDispatcher::default();
    let scheduler  = ReminderScheduler::new(
      settings(),
      store.clone(),
      source.clone(),
      store.clone(),
      dispatcher.clone(),
    );

    Harness { store, source, dispatcher, alice, bob, scheduler }
  }

  async fn cycle(h: &Harness, at: DateTime<Utc>) -> CycleReport {
    h.scheduler.run_cycle_at(at, &CancellationToken::new()).await.unwrap()
  }

  // ── Cycle behaviour ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn second_cycle_on_same_day_dispatches_nothing() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![
      assignment("cw-1", now() + Duration::hours(2)),
      assignment("cw-2", now() + Duration::hours(3)),
    ]);

    let first = cycle(&h, now()).await;
    assert_eq!(first.batches_sent, 1);
    assert_eq!(first.assignments_notified, 2);
    assert_eq!(h.dispatcher.attempts(), vec![(
      h.alice.user_id,
      vec!["cw-1".to_string(), "cw-2".to_string()],
    )]);

    let second = cycle(&h, now() + Duration::minutes(30)).await;
    assert_eq!(second.batches_sent, 0);
    assert_eq!(h.dispatcher.attempts().len(), 1);
    assert_eq!(h.store.notifications_for(h.alice.user_id).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn failed_dispatch_records_nothing_and_is_retried() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![assignment("cw-1", now() + Duration::hours(2))]);
    h.dispatcher.fail_for(h.alice.user_id, true);

    let first = cycle(&h, now()).await;
    assert_eq!(first.failed, 1);
    assert!(h.store.notifications_for(h.alice.user_id).await.unwrap().is_empty());

    h.dispatcher.fail_for(h.alice.user_id, false);
    let second = cycle(&h, now() + Duration::minutes(10)).await;
    assert_eq!(second.batches_sent, 1);

    let attempts = h.dispatcher.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0], attempts[1]);
    assert_eq!(h.store.notifications_for(h.alice.user_id).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn fetch_failure_for_one_user_does_not_stop_the_next() {
    let h = harness().await;
    h.source.0.lock().unwrap().failing.insert(h.alice.user_id);
    h.source.set(h.bob.user_id, vec![assignment("cw-9", now() + Duration::hours(1))]);

    let report = cycle(&h, now()).await;
    assert_eq!(report.users, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.batches_sent, 1);
    assert_eq!(h.dispatcher.attempts(), vec![(h.bob.user_id, vec!["cw-9".to_string()])]);
  }

  #[tokio::test]
  async fn only_assignments_inside_the_window_are_sent() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![
      assignment("soon", now() + Duration::hours(5)),
      assignment("later", now() + Duration::hours(7)),
      assignment("past", now() - Duration::minutes(1)),
    ]);

    cycle(&h, now()).await;
    assert_eq!(h.dispatcher.attempts(), vec![(h.alice.user_id, vec!["soon".to_string()])]);
  }

  #[tokio::test]
  async fn users_with_nothing_due_are_never_dispatched() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![]);
    h.source.set(h.bob.user_id, vec![assignment("late", now() + Duration::hours(9))]);

    let report = cycle(&h, now()).await;
    assert_eq!(report.batches_sent, 0);
    assert!(h.dispatcher.attempts().is_empty());
  }

  #[tokio::test]
  async fn expired_credentials_are_skipped_without_fetching() {
    let h = harness().await;
    let carol = user(&h.store, "carol", now()).await;
    h.source.set(carol.user_id, vec![assignment("cw-1", now() + Duration::hours(1))]);

    let report = cycle(&h, now()).await;
    assert_eq!(report.skipped_expired, 1);
    assert!(!h.source.calls().contains(&carol.user_id));
    assert!(h.dispatcher.attempts().is_empty());
  }

  #[tokio::test]
  async fn credential_listing_failure_abandons_the_cycle() {
    let h = harness().await;
    let scheduler = ReminderScheduler::new(
      settings(),
      BrokenCredentials,
      h.source.clone(),
      h.store.clone(),
      h.dispatcher.clone(),
    );

    let err = scheduler.run_cycle_at(now(), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CycleError::ListCredentials(_)));
    assert!(h.source.calls().is_empty());
  }

  #[tokio::test]
  async fn delivered_batch_is_counted_even_if_recording_fails() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![
      assignment("cw-1", now() + Duration::hours(2)),
      assignment("cw-2", now() + Duration::hours(3)),
    ]);
    let scheduler = ReminderScheduler::new(
      settings(),
      h.store.clone(),
      h.source.clone(),
      ForgetfulLedger,
      h.dispatcher.clone(),
    );

    let report = scheduler.run_cycle_at(now(), &CancellationToken::new()).await.unwrap();
    assert_eq!(report.batches_sent, 1);
    assert_eq!(report.assignments_notified, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(h.dispatcher.attempts().len(), 1);
  }

  #[tokio::test]
  async fn the_next_day_notifies_again() {
    let h = harness().await;
    let mut wide = settings();
    wide.lookahead = Duration::hours(30);
    let scheduler = ReminderScheduler::new(
      wide,
      h.store.clone(),
      h.source.clone(),
      h.store.clone(),
      h.dispatcher.clone(),
    );
    user(&h.store, "alice", now() + Duration::days(3)).await;
    h.source.set(h.alice.user_id, vec![assignment("cw-1", now() + Duration::hours(28))]);

    let cancel = CancellationToken::new();
    scheduler.run_cycle_at(now(), &cancel).await.unwrap();
    scheduler.run_cycle_at(now() + Duration::hours(1), &cancel).await.unwrap();
    assert_eq!(h.dispatcher.attempts().len(), 1);

    // 02:00 the following day is a new ledger date.
    scheduler.run_cycle_at(now() + Duration::hours(8), &cancel).await.unwrap();
    assert_eq!(h.dispatcher.attempts().len(), 2);

    let dates: Vec<_> = h
      .store
      .notifications_for(h.alice.user_id)
      .await
      .unwrap()
      .into_iter()
      .map(|r| r.sent_on)
      .collect();
    assert_eq!(dates, vec![today(), today().succ_opt().unwrap()]);
  }

  #[tokio::test]
  async fn many_cycles_leave_at_most_one_record_per_key() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![
      assignment("cw-1", now() + Duration::hours(4)),
      assignment("cw-1", now() + Duration::hours(4)),
      assignment("cw-2", now() + Duration::hours(5)),
    ]);
    h.source.set(h.bob.user_id, vec![assignment("cw-1", now() + Duration::hours(4))]);

    for minutes in [0, 5, 10, 15, 20] {
      cycle(&h, now() + Duration::minutes(minutes)).await;
    }

    let attempts = h.dispatcher.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].1, vec!["cw-1".to_string(), "cw-2".to_string()]);
    assert_eq!(h.store.notifications_for(h.alice.user_id).await.unwrap().len(), 2);
    assert_eq!(h.store.notifications_for(h.bob.user_id).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unresponsive_source_times_out_and_the_cycle_continues() {
    let h = harness().await;
    h.source.0.lock().unwrap().hanging.insert(h.alice.user_id);
    h.source.set(h.bob.user_id, vec![assignment("cw-1", now() + Duration::hours(1))]);

    let report = cycle(&h, now()).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.batches_sent, 1);
    assert_eq!(h.dispatcher.attempts()[0].0, h.bob.user_id);
  }

  // ── Cancellation ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn shutdown_mid_cycle_finishes_the_current_user_only() {
    let h = harness().await;
    h.source.set(h.alice.user_id, vec![assignment("cw-1", now() + Duration::hours(1))]);
    h.source.set(h.bob.user_id, vec![assignment("cw-2", now() + Duration::hours(1))]);

    let cancel = CancellationToken::new();
    h.dispatcher.0.lock().unwrap().cancel_on_send = Some(cancel.clone());

    let report = h.scheduler.run_cycle_at(now(), &cancel).await.unwrap();
    assert!(report.interrupted);
    assert_eq!(report.batches_sent, 1);
    assert_eq!(h.store.notifications_for(h.alice.user_id).await.unwrap().len(), 1);
    assert_eq!(h.source.calls(), vec![h.alice.user_id]);
  }

  #[tokio::test]
  async fn run_loop_returns_promptly_when_cancelled_while_sleeping() {
    let h = harness().await;
    let cancel = CancellationToken::new();
    let task = tokio::spawn(h.scheduler.run(cancel.clone()));

    tokio::time::sleep(StdDuration::from_millis(20)).await;
    cancel.cancel();

    tokio::time::timeout(StdDuration::from_secs(2), task)
      .await
      .expect("scheduler did not stop")
      .unwrap();
    assert!(h.source.calls().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn run_loop_runs_one_cycle_per_wake_slot() {
    let h = harness().await;
    let wall_now = Utc::now();
    user(&h.store, "alice", wall_now + Duration::days(7)).await;
    h.source.set(h.alice.user_id, vec![assignment("cw-1", wall_now + Duration::hours(2))]);

    let started = Instant::now();
    let fetched = h.source.0.lock().unwrap().fetched.clone();
    let cancel  = CancellationToken::new();
    let task    = tokio::spawn(h.scheduler.run(cancel.clone()));

    // Paused time jumps straight to each wake; wait for two cycles.
    while h.source.calls().len() < 2 {
      fetched.notified().await;
    }
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(h.source.calls(), vec![h.alice.user_id, h.alice.user_id]);
    assert_eq!(h.dispatcher.attempts(), vec![(h.alice.user_id, vec!["cw-1".to_string()])]);
    assert_eq!(h.store.notifications_for(h.alice.user_id).await.unwrap().len(), 1);

    let day = StdDuration::from_secs(24 * 60 * 60);
    let at  = h.source.0.lock().unwrap().called_at.clone();
    assert!(at[0] - started <= day);
    // The second cycle waits for the following day's slot rather than
    // re-running the one that just fired.
    assert!(at[1] - at[0] >= day - StdDuration::from_secs(60));
  }

  #[tokio::test]
  async fn next_wake_never_repeats_the_slot_that_just_ran() {
    let h  = harness().await;
    let at = |day, hour, min, sec| Utc.with_ymd_and_hms(2024, 10, day, hour, min, sec).unwrap();
    let six_pm = at(7, 18, 0, 0);

    assert_eq!(h.scheduler.next_wake_after(at(7, 17, 0, 0), None), six_pm);
    assert_eq!(h.scheduler.next_wake_after(at(7, 18, 0, 0), None), six_pm);

    // Timer fired a little early.
    let early = six_pm - Duration::milliseconds(5);
    assert_eq!(h.scheduler.next_wake_after(early, Some(six_pm)), at(8, 18, 0, 0));
    // Cycle finished after the slot.
    assert_eq!(h.scheduler.next_wake_after(at(7, 18, 3, 0), Some(six_pm)), at(8, 18, 0, 0));
    // Yesterday's slot does not hold back today's.
    assert_eq!(
      h.scheduler.next_wake_after(at(7, 17, 0, 0), Some(at(6, 18, 0, 0))),
      six_pm
    );
  }

  #[test]
  fn utc_clock_is_used_for_ledger_dates() {
    assert_eq!(settings().clock, WallClock::Zone(chrono_tz::UTC));
  }
}
