//! Classroom REST payloads and their conversion into domain assignments.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use duewatch_core::assignment::Assignment;
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CourseList {
  pub courses:         Vec<Course>,
  pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Course {
  pub id:   String,
  pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CourseWorkList {
  pub course_work:     Vec<CourseWork>,
  pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CourseWork {
  pub id:       String,
  pub title:    String,
  pub due_date: Option<Date>,
  pub due_time: Option<TimeOfDay>,
}

/// A calendar date as Classroom sends it. Fields are omitted when zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Date {
  pub year:  i32,
  pub month: u32,
  pub day:   u32,
}

/// A wall-clock time in UTC. Fields are omitted when zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TimeOfDay {
  pub hours:   u32,
  pub minutes: u32,
  pub seconds: u32,
}

impl CourseWork {
  /// The due instant, or `None` when the due date or time is unset.
  pub fn due_instant(&self) -> Result<Option<DateTime<Utc>>> {
    let (Some(date), Some(time)) = (self.due_date, self.due_time) else {
      return Ok(None);
    };

    let invalid = || Error::InvalidDueDate { id: self.id.clone() };
    let date = NaiveDate::from_ymd_opt(date.year, date.month, date.day).ok_or_else(invalid)?;
    let time =
      NaiveTime::from_hms_opt(time.hours, time.minutes, time.seconds).ok_or_else(invalid)?;

    Ok(Some(date.and_time(time).and_utc()))
  }

  pub fn into_assignment(self, course: &Course) -> Result<Option<Assignment>> {
    let Some(due_time) = self.due_instant()? else {
      return Ok(None);
    };
    Ok(Some(Assignment {
      course_id: course.id.clone(),
      course_name: course.name.clone(),
      assignment_id: self.id,
      title: self.title,
      due_time,
    }))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn course() -> Course {
    Course { id: "c-1".into(), name: "Physics".into() }
  }

  #[test]
  fn coursework_with_date_and_time_converts() {
    let work: CourseWork = serde_json::from_value(serde_json::json!({
      "id": "cw-1",
      "courseId": "c-1",
      "title": "Lab report",
      "dueDate": { "year": 2024, "month": 10, "day": 7 },
      "dueTime": { "hours": 23, "minutes": 59 },
      "state": "PUBLISHED"
    }))
    .unwrap();

    let assignment = work.into_assignment(&course()).unwrap().unwrap();
    assert_eq!(assignment.assignment_id, "cw-1");
    assert_eq!(assignment.course_name, "Physics");
    assert_eq!(assignment.due_time, Utc.with_ymd_and_hms(2024, 10, 7, 23, 59, 0).unwrap());
  }

  #[test]
  fn midnight_due_time_arrives_as_empty_object() {
    let work: CourseWork = serde_json::from_value(serde_json::json!({
      "id": "cw-2",
      "title": "Quiz",
      "dueDate": { "year": 2024, "month": 10, "day": 8 },
      "dueTime": {}
    }))
    .unwrap();

    assert_eq!(
      work.due_instant().unwrap(),
      Some(Utc.with_ymd_and_hms(2024, 10, 8, 0, 0, 0).unwrap())
    );
  }

  #[test]
  fn coursework_without_due_time_is_excluded() {
    let work: CourseWork = serde_json::from_value(serde_json::json!({
      "id": "cw-3",
      "title": "Reading",
      "dueDate": { "year": 2024, "month": 10, "day": 8 }
    }))
    .unwrap();
    assert!(work.into_assignment(&course()).unwrap().is_none());
  }

  #[test]
  fn impossible_date_is_an_error() {
    let work = CourseWork {
      id: "cw-4".into(),
      due_date: Some(Date { year: 2024, month: 2, day: 30 }),
      due_time: Some(TimeOfDay::default()),
      ..Default::default()
    };
    assert!(matches!(work.due_instant(), Err(Error::InvalidDueDate { id }) if id == "cw-4"));
  }

  #[test]
  fn empty_list_bodies_deserialize() {
    let courses: CourseList = serde_json::from_str("{}").unwrap();
    assert!(courses.courses.is_empty());
    assert!(courses.next_page_token.is_none());
  }
}
