use chrono::NaiveDate;

use crate::datetime::add_days;
use crate::task::{
  Priority,
  Project,
  Status,
  Task
};

const UPCOMING_WINDOW_DAYS: i64 = 7;
const UPCOMING_LIMIT: usize = 5;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct StatusCounts {
  pub pending:     usize,
  pub in_progress: usize,
  pub completed:   usize
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct PriorityCounts {
  pub low:    usize,
  pub medium: usize,
  pub high:   usize
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct ProjectProgress {
  pub project_id: String,
  pub name:       String,
  pub total:      usize,
  pub completed:  usize
}

impl ProjectProgress {
  /// Whole percent, 0 for an empty
  /// project.
  pub fn percent(&self) -> usize {
    if self.total == 0 {
      return 0;
    }
    self.completed * 100 / self.total
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct UpcomingTask {
  pub task_id: String,
  pub title:   String,
  pub due:     NaiveDate
}

/// Workspace summary for the `dashboard`
/// command.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct Dashboard {
  pub today:     NaiveDate,
  pub total:     usize,
  pub status:    StatusCounts,
  pub priority:  PriorityCounts,
  pub overdue:   usize,
  pub due_today: usize,
  pub upcoming:  Vec<UpcomingTask>,
  pub projects:  Vec<ProjectProgress>
}

impl Dashboard {
  #[tracing::instrument(skip_all, fields(tasks = tasks.len(), %today))]
  pub fn build(
    tasks: &[Task],
    projects: &[Project],
    today: NaiveDate
  ) -> Self {
    let mut status =
      StatusCounts::default();
    let mut priority =
      PriorityCounts::default();
    let mut overdue = 0;
    let mut due_today = 0;
    let horizon = add_days(
      today,
      UPCOMING_WINDOW_DAYS
    );
    let mut upcoming = Vec::new();

    for task in tasks {
      match task.status {
        | Status::Pending => {
          status.pending += 1
        }
        | Status::InProgress => {
          status.in_progress += 1
        }
        | Status::Completed => {
          status.completed += 1
        }
      }
      match task.priority {
        | Priority::Low => {
          priority.low += 1
        }
        | Priority::Medium => {
          priority.medium += 1
        }
        | Priority::High => {
          priority.high += 1
        }
      }

      if task.is_overdue(today) {
        overdue += 1;
      }
      if task.is_completed() {
        continue;
      }
      let Some(due) = task.due_date
      else {
        continue;
      };
      if due == today {
        due_today += 1;
      }
      if due >= today && due <= horizon {
        upcoming.push(UpcomingTask {
          task_id: task.id.clone(),
          title: task.title.clone(),
          due
        });
      }
    }

    // Stable sort keeps collection order
    // among equal due dates.
    upcoming.sort_by_key(|item| item.due);
    upcoming.truncate(UPCOMING_LIMIT);

    let projects = projects
      .iter()
      .map(|project| {
        let owned = tasks.iter().filter(
          |task| {
            task.project_id.as_deref()
              == Some(project.id.as_str())
          }
        );
        let (total, completed) = owned
          .fold((0, 0), |(total, done), task| {
            (
              total + 1,
              done + usize::from(
                task.is_completed()
              )
            )
          });
        ProjectProgress {
          project_id: project.id.clone(),
          name: project.name.clone(),
          total,
          completed
        }
      })
      .collect();

    Self {
      today,
      total: tasks.len(),
      status,
      priority,
      overdue,
      due_today,
      upcoming,
      projects
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn task(
    title: &str,
    status: Status,
    due: Option<NaiveDate>
  ) -> Task {
    let now = Utc
      .with_ymd_and_hms(
        2024, 3, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let mut task = Task::new_pending(
      "ws",
      title.to_string(),
      now
    );
    task.status = status;
    task.due_date = due;
    task
  }

  #[test]
  fn counts_overdue_today_and_upcoming()
  {
    let today = date(2024, 3, 15);
    let mut high = task(
      "late",
      Status::Pending,
      Some(date(2024, 3, 10))
    );
    high.priority = Priority::High;
    let tasks = vec![
      high,
      task(
        "finished late",
        Status::Completed,
        Some(date(2024, 3, 1))
      ),
      task(
        "today",
        Status::InProgress,
        Some(today)
      ),
      task(
        "friday",
        Status::Pending,
        Some(date(2024, 3, 22))
      ),
      task(
        "too far",
        Status::Pending,
        Some(date(2024, 3, 23))
      ),
      task("undated", Status::Pending, None),
    ];

    let dash =
      Dashboard::build(&tasks, &[], today);
    assert_eq!(dash.total, 6);
    assert_eq!(
      dash.status,
      StatusCounts {
        pending:     4,
        in_progress: 1,
        completed:   1
      }
    );
    assert_eq!(dash.priority.high, 1);
    assert_eq!(dash.priority.medium, 5);
    assert_eq!(dash.overdue, 1);
    assert_eq!(dash.due_today, 1);
    let titles = dash
      .upcoming
      .iter()
      .map(|item| item.title.as_str())
      .collect::<Vec<_>>();
    assert_eq!(titles, vec!["today", "friday"]);
  }

  #[test]
  fn upcoming_is_sorted_and_capped() {
    let today = date(2024, 3, 15);
    let tasks = (0..7)
      .map(|i| {
        task(
          &format!("t{i}"),
          Status::Pending,
          Some(date(2024, 3, 21 - i))
        )
      })
      .collect::<Vec<_>>();

    let dash =
      Dashboard::build(&tasks, &[], today);
    assert_eq!(
      dash.upcoming.len(),
      UPCOMING_LIMIT
    );
    assert_eq!(
      dash.upcoming[0].due,
      date(2024, 3, 15)
    );
    assert!(
      dash
        .upcoming
        .windows(2)
        .all(|pair| pair[0].due <= pair[1].due)
    );
  }

  #[test]
  fn project_progress_counts_completed()
  {
    let now = Utc
      .with_ymd_and_hms(
        2024, 3, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let project = Project::new(
      "ws",
      "Launch".to_string(),
      now
    );
    let empty = Project::new(
      "ws",
      "Empty".to_string(),
      now
    );
    let mut a =
      task("a", Status::Completed, None);
    a.project_id = Some(project.id.clone());
    let mut b =
      task("b", Status::Pending, None);
    b.project_id = Some(project.id.clone());
    let mut c =
      task("c", Status::Completed, None);
    c.project_id = Some(project.id.clone());

    let dash = Dashboard::build(
      &[a, b, c],
      &[project, empty],
      date(2024, 3, 15)
    );
    assert_eq!(dash.projects[0].total, 3);
    assert_eq!(
      dash.projects[0].completed,
      2
    );
    assert_eq!(
      dash.projects[0].percent(),
      66
    );
    assert_eq!(dash.projects[1].percent(), 0);
  }
}
