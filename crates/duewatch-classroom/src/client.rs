//! [`ClassroomClient`], the Classroom REST implementation of
//! [`AssignmentSource`].

use duewatch_core::{
  assignment::{Assignment, DueWindow},
  credential::Credential,
  remote::AssignmentSource,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::{
  Result, check_status, http_client,
  wire::{Course, CourseList, CourseWork, CourseWorkList},
};

pub const DEFAULT_BASE_URL: &str = "https://classroom.googleapis.com";

/// Async client for the Classroom v1 API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ClassroomClient {
  http:     Client,
  base_url: Url,
}

impl ClassroomClient {
  pub fn new() -> Result<Self> { Self::with_base_url(DEFAULT_BASE_URL) }

  /// Point the client at another host, e.g. a mock server.
  pub fn with_base_url(base_url: &str) -> Result<Self> {
    Ok(Self { http: http_client()?, base_url: Url::parse(base_url)? })
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// Follow `nextPageToken` until the listing is exhausted.
  async fn paged<P, T>(
    &self,
    name:  &str,
    url:   Url,
    query: &[(&str, &str)],
    token: &str,
    split: impl Fn(P) -> (Vec<T>, Option<String>),
  ) -> Result<Vec<T>>
  where
    P: DeserializeOwned,
  {
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
      let mut req = self.http.get(url.clone()).bearer_auth(token).query(query);
      if let Some(t) = &page_token {
        req = req.query(&[("pageToken", t)]);
      }

      let resp = check_status(name, req.send().await?).await?;
      let (page, next) = split(resp.json::<P>().await?);
      items.extend(page);

      match next.filter(|t| !t.is_empty()) {
        Some(next) => page_token = Some(next),
        None => return Ok(items),
      }
    }
  }

  // ── Listings ──────────────────────────────────────────────────────────────

  /// `GET /v1/courses?courseStates=ACTIVE`
  async fn active_courses(&self, token: &str) -> Result<Vec<Course>> {
    self
      .paged(
        "courses.list",
        self.endpoint(&["v1", "courses"]),
        &[("courseStates", "ACTIVE")],
        token,
        |page: CourseList| (page.courses, page.next_page_token),
      )
      .await
  }

  /// `GET /v1/courses/{id}/courseWork`
  async fn course_work(&self, token: &str, course_id: &str) -> Result<Vec<CourseWork>> {
    self
      .paged(
        "courseWork.list",
        self.endpoint(&["v1", "courses", course_id, "courseWork"]),
        &[],
        token,
        |page: CourseWorkList| (page.course_work, page.next_page_token),
      )
      .await
  }

  /// Every assignment with a due date and time across the user's active
  /// courses, in course order.
  ///
  /// A course whose coursework cannot be listed is logged and skipped; only a
  /// failure to list the courses themselves is an error.
  pub async fn fetch_all(&self, credential: &Credential) -> Result<Vec<Assignment>> {
    let token   = credential.access_token.as_str();
    let courses = self.active_courses(token).await?;
    debug!(user_id = credential.user_id, courses = courses.len(), "listed active courses");

    let mut assignments = Vec::new();
    for course in &courses {
      let work = match self.course_work(token, &course.id).await {
        Ok(work) => work,
        Err(e) => {
          warn!(
            user_id = credential.user_id,
            course_id = %course.id,
            course = %course.name,
            error = %e,
            "could not list coursework; skipping course"
          );
          continue;
        }
      };

      for item in work {
        match item.into_assignment(course) {
          Ok(Some(assignment)) => assignments.push(assignment),
          Ok(None) => {}
          Err(e) => warn!(course_id = %course.id, error = %e, "skipping coursework"),
        }
      }
    }

    Ok(assignments)
  }
}

impl AssignmentSource for ClassroomClient {
  type Error = crate::Error;

  async fn fetch_upcoming(
    &self,
    credential: &Credential,
    window:     DueWindow,
  ) -> Result<Vec<Assignment>> {
    let mut assignments = self.fetch_all(credential).await?;
    assignments.retain(|a| window.contains(a.due_time));
    Ok(assignments)
  }
}
