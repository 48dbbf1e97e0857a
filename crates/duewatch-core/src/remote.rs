//! Traits over the two remote services a cycle talks to: the classroom API
//! that supplies assignments and the channel that delivers reminders.

use std::future::Future;

use crate::{
  UserId,
  assignment::{Assignment, DueWindow},
  credential::Credential,
};

/// Supplies the assignments a user has due inside a window.
pub trait AssignmentSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Assignments whose due time lies in `window` (start-inclusive,
  /// end-exclusive), each tagged with its course. Coursework without both a
  /// due date and a due time is never returned. An empty result is normal.
  fn fetch_upcoming<'a>(
    &'a self,
    credential: &'a Credential,
    window: DueWindow,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + 'a;
}

/// Delivers one batch of reminders to a user's channel.
pub trait NotificationDispatcher: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Deliver `assignments` as a single unit. Either the channel accepts the
  /// whole batch or the call fails; there is no per-assignment status.
  /// Callers never pass an empty batch.
  fn send<'a>(
    &'a self,
    user_id: UserId,
    assignments: &'a [Assignment],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
