use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use uuid::Uuid;

use crate::datetime::lenient_date_serde;

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  Pending,
  InProgress,
  Completed
}

impl Status {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Pending => "pending",
      | Self::InProgress => {
        "in_progress"
      }
      | Self::Completed => "completed"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Pending => "Pending",
      | Self::InProgress => {
        "In Progress"
      }
      | Self::Completed => "Completed"
    }
  }
}

impl FromStr for Status {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let key = s
      .trim()
      .to_ascii_lowercase()
      .replace(['-', ' '], "_");
    match key.as_str() {
      | "pending" | "todo" => {
        Ok(Self::Pending)
      }
      | "in_progress"
      | "inprogress"
      | "started" => Ok(Self::InProgress),
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | _ => {
        Err(anyhow!(
          "invalid status: {s} \
           (expected pending, \
           in_progress or completed)"
        ))
      }
    }
  }
}

impl fmt::Display for Status {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High
}

impl Priority {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Low => "low",
      | Self::Medium => "medium",
      | Self::High => "high"
    }
  }
}

impl FromStr for Priority {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => Ok(Self::Low),
      | "medium" | "med" | "m" => {
        Ok(Self::Medium)
      }
      | "high" | "h" => Ok(Self::High),
      | _ => {
        Err(anyhow!(
          "invalid priority: {s}"
        ))
      }
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

/// Color tag shown next to a project's
/// name and on its tasks' calendar
/// markers.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectColor {
  #[default]
  Blue,
  Green,
  Red,
  Orange,
  Purple,
  Teal,
  Gray
}

impl ProjectColor {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Blue => "blue",
      | Self::Green => "green",
      | Self::Red => "red",
      | Self::Orange => "orange",
      | Self::Purple => "purple",
      | Self::Teal => "teal",
      | Self::Gray => "gray"
    }
  }

  /// ANSI foreground code used by the
  /// terminal painter.
  pub fn ansi_code(self) -> &'static str {
    match self {
      | Self::Blue => "34",
      | Self::Green => "32",
      | Self::Red => "31",
      | Self::Orange => "33",
      | Self::Purple => "35",
      | Self::Teal => "36",
      | Self::Gray => "90"
    }
  }
}

impl FromStr for ProjectColor {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "blue" => Ok(Self::Blue),
      | "green" => Ok(Self::Green),
      | "red" => Ok(Self::Red),
      | "orange" => Ok(Self::Orange),
      | "purple" => Ok(Self::Purple),
      | "teal" => Ok(Self::Teal),
      | "gray" | "grey" => {
        Ok(Self::Gray)
      }
      | _ => {
        Err(anyhow!(
          "invalid project color: {s}"
        ))
      }
    }
  }
}

impl fmt::Display for ProjectColor {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Project {
  pub id:           String,
  pub workspace_id: String,
  pub name:         String,
  #[serde(default)]
  pub description:  String,
  #[serde(default)]
  pub color:        ProjectColor,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>
}

impl Project {
  pub fn new(
    workspace_id: &str,
    name: String,
    now: DateTime<Utc>
  ) -> Self {
    Self {
      id: new_id(),
      workspace_id: workspace_id
        .to_string(),
      name,
      description: String::new(),
      color: ProjectColor::default(),
      created_at: now,
      updated_at: now
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:           String,
  pub workspace_id: String,
  #[serde(default)]
  pub project_id:   Option<String>,
  pub title:        String,
  #[serde(default)]
  pub description:  Option<String>,
  pub status:       Status,
  #[serde(default)]
  pub priority:     Priority,
  #[serde(
    default,
    with = "lenient_date_serde::option"
  )]
  pub start_date:   Option<NaiveDate>,
  #[serde(
    default,
    with = "lenient_date_serde::option"
  )]
  pub due_date:     Option<NaiveDate>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>
}

impl Task {
  pub fn new_pending(
    workspace_id: &str,
    title: String,
    now: DateTime<Utc>
  ) -> Self {
    Self {
      id: new_id(),
      workspace_id: workspace_id
        .to_string(),
      project_id: None,
      title,
      description: None,
      status: Status::Pending,
      priority: Priority::default(),
      start_date: None,
      due_date: None,
      created_at: now,
      updated_at: now
    }
  }

  /// Closed `[start, due]` interval when
  /// both endpoints are set.
  pub fn interval(
    &self
  ) -> Option<(NaiveDate, NaiveDate)> {
    Some((self.start_date?, self.due_date?))
  }

  pub fn has_inverted_interval(
    &self
  ) -> bool {
    self
      .interval()
      .is_some_and(|(start, due)| {
        start > due
      })
  }

  pub fn is_completed(&self) -> bool {
    self.status == Status::Completed
  }

  pub fn is_overdue(
    &self,
    today: NaiveDate
  ) -> bool {
    !self.is_completed()
      && self
        .due_date
        .is_some_and(|due| due < today)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Comment {
  pub id:         String,
  pub task_id:    String,
  #[serde(default)]
  pub author:     Option<String>,
  pub body:       String,
  pub created_at: DateTime<Utc>
}

impl Comment {
  pub fn new(
    task_id: &str,
    body: String,
    now: DateTime<Utc>
  ) -> Self {
    Self {
      id: new_id(),
      task_id: task_id.to_string(),
      author: None,
      body,
      created_at: now
    }
  }
}

pub fn new_id() -> String {
  Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::*;

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 3, 15, 9, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn status_parses_loose_spellings() {
    for raw in [
      "in_progress",
      "In-Progress",
      "inprogress",
      "in progress"
    ] {
      assert_eq!(
        raw
          .parse::<Status>()
          .expect("parse status"),
        Status::InProgress
      );
    }
    assert_eq!(
      "done"
        .parse::<Status>()
        .expect("parse status"),
      Status::Completed
    );
    assert!(
      "archived"
        .parse::<Status>()
        .is_err()
    );
  }

  #[test]
  fn task_serializes_snake_case_status_and_plain_dates()
  {
    let mut task = Task::new_pending(
      "ws",
      "Ship calendar".to_string(),
      now()
    );
    task.status = Status::InProgress;
    task.due_date = Some(date(2024, 3, 12));

    let json = serde_json::to_value(&task)
      .expect("serialize task");
    assert_eq!(
      json["status"],
      "in_progress"
    );
    assert_eq!(
      json["due_date"],
      "2024-03-12"
    );
    assert!(json["start_date"].is_null());
  }

  #[test]
  fn task_reads_timestamps_as_dates_and_drops_garbage()
  {
    let raw = r#"{
      "id": "t1",
      "workspace_id": "ws",
      "title": "Review",
      "status": "pending",
      "priority": "high",
      "start_date": "2024-03-10T23:30:00Z",
      "due_date": "not a date",
      "created_at": "2024-03-01T00:00:00Z",
      "updated_at": "2024-03-01T00:00:00Z"
    }"#;
    let task: Task = serde_json::from_str(
      raw
    )
    .expect("deserialize task");

    assert_eq!(
      task.start_date,
      Some(date(2024, 3, 10))
    );
    assert_eq!(task.due_date, None);
    assert_eq!(
      task.priority,
      Priority::High
    );
  }

  #[test]
  fn inverted_interval_is_detected() {
    let mut task = Task::new_pending(
      "ws",
      "Backwards".to_string(),
      now()
    );
    task.start_date =
      Some(date(2024, 3, 12));
    task.due_date = Some(date(2024, 3, 10));
    assert!(task.has_inverted_interval());

    task.due_date = None;
    assert!(!task.has_inverted_interval());
  }

  #[test]
  fn overdue_ignores_completed_tasks() {
    let mut task = Task::new_pending(
      "ws",
      "Late".to_string(),
      now()
    );
    task.due_date = Some(date(2024, 3, 1));
    assert!(
      task.is_overdue(date(2024, 3, 2))
    );
    task.status = Status::Completed;
    assert!(
      !task.is_overdue(date(2024, 3, 2))
    );
  }
}
