use chrono::NaiveDate;

use super::events::events_for_date;
use crate::datetime::{
  format_date,
  format_long_date
};
use crate::intent::CalendarIntent;
use crate::task::{
  Priority,
  Project,
  ProjectColor,
  Status,
  Task
};

pub const EMPTY_DAY_MESSAGE: &str =
  "No tasks scheduled for this day.";

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct ProjectLabel {
  pub name:  String,
  pub color: ProjectColor
}

/// One row of the day popup.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct EventSummary {
  pub task_id:     String,
  pub title:       String,
  pub project:     Option<ProjectLabel>,
  pub status:      Status,
  pub description: Option<String>,
  pub date_line:   Option<String>,
  pub open:        CalendarIntent
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct DayPopup {
  pub date:     NaiveDate,
  pub heading:  String,
  pub events:   Vec<EventSummary>,
  pub new_task: CalendarIntent
}

impl DayPopup {
  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn empty_message(
    &self
  ) -> Option<&'static str> {
    self
      .is_empty()
      .then_some(EMPTY_DAY_MESSAGE)
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct TaskAffordance {
  pub label:  &'static str,
  pub intent: CalendarIntent
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct TaskDetail {
  pub task_id:     String,
  pub title:       String,
  pub project:     Option<ProjectLabel>,
  pub status:      Status,
  pub priority:    Priority,
  pub start_date:  Option<NaiveDate>,
  pub due_date:    Option<NaiveDate>,
  pub date_line:   Option<String>,
  pub description: Option<String>,
  pub actions:     Vec<TaskAffordance>
}

#[tracing::instrument(skip(tasks, projects), fields(task_count = tasks.len()))]
pub fn present_day(
  date: NaiveDate,
  tasks: &[Task],
  projects: &[Project]
) -> DayPopup {
  let events = events_for_date(
    date, tasks
  )
  .into_iter()
  .map(|task| {
    EventSummary {
      task_id:     task.id.clone(),
      title:       task.title.clone(),
      project:     project_label(
        task, projects
      ),
      status:      task.status,
      description: non_blank(
        task.description.as_deref()
      ),
      date_line:   date_line(task),
      open:
        CalendarIntent::OpenTaskDetail(
          task.id.clone()
        )
    }
  })
  .collect::<Vec<_>>();

  tracing::debug!(
    events = events.len(),
    "presented day"
  );

  DayPopup {
    date,
    heading: format_long_date(date),
    events,
    new_task:
      CalendarIntent::NewTaskWithDate(
        date
      )
  }
}

/// Detail panel for one task; `None` when
/// the id is unknown.
pub fn present_task(
  task_id: &str,
  tasks: &[Task],
  projects: &[Project]
) -> Option<TaskDetail> {
  let Some(task) = tasks
    .iter()
    .find(|task| task.id == task_id)
  else {
    tracing::debug!(
      task_id,
      "no task to present"
    );
    return None;
  };

  let mut actions = vec![
    TaskAffordance {
      label:  "edit",
      intent:
        CalendarIntent::OpenEditTask(
          task.id.clone()
        )
    },
    TaskAffordance {
      label:  "delete",
      intent: CalendarIntent::DeleteTask(
        task.id.clone()
      )
    },
  ];
  if !task.is_completed() {
    actions.push(TaskAffordance {
      label:  "complete",
      intent:
        CalendarIntent::CompleteTask(
          task.id.clone()
        )
    });
  }

  Some(TaskDetail {
    task_id: task.id.clone(),
    title: task.title.clone(),
    project: project_label(
      task, projects
    ),
    status: task.status,
    priority: task.priority,
    start_date: task.start_date,
    due_date: task.due_date,
    date_line: date_line(task),
    description: non_blank(
      task.description.as_deref()
    ),
    actions
  })
}

fn project_label(
  task: &Task,
  projects: &[Project]
) -> Option<ProjectLabel> {
  let project_id =
    task.project_id.as_deref()?;
  projects
    .iter()
    .find(|project| {
      project.id == project_id
    })
    .map(|project| {
      ProjectLabel {
        name:  project.name.clone(),
        color: project.color
      }
    })
}

fn date_line(
  task: &Task
) -> Option<String> {
  match (task.start_date, task.due_date)
  {
    | (Some(start), Some(due)) => {
      Some(format!(
        "Start: {} · Due: {}",
        format_date(start),
        format_date(due)
      ))
    }
    | (Some(start), None) => {
      Some(format!(
        "Start: {}",
        format_date(start)
      ))
    }
    | (None, Some(due)) => {
      Some(format!(
        "Due: {}",
        format_date(due)
      ))
    }
    | (None, None) => None
  }
}

fn non_blank(
  raw: Option<&str>
) -> Option<String> {
  raw
    .map(str::trim)
    .filter(|text| !text.is_empty())
    .map(str::to_string)
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

  fn fixtures() -> (Vec<Task>, Vec<Project>)
  {
    let now = Utc
      .with_ymd_and_hms(
        2024, 3, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let mut project = Project::new(
      "ws",
      "Website".to_string(),
      now
    );
    project.color = ProjectColor::Teal;

    let mut sprint = Task::new_pending(
      "ws",
      "Sprint".to_string(),
      now
    );
    sprint.start_date =
      Some(date(2024, 3, 10));
    sprint.due_date =
      Some(date(2024, 3, 12));
    sprint.project_id =
      Some(project.id.clone());
    sprint.description =
      Some("  ship it  ".to_string());

    let mut review = Task::new_pending(
      "ws",
      "Review".to_string(),
      now
    );
    review.due_date =
      Some(date(2024, 3, 11));
    review.status = Status::Completed;
    review.description =
      Some("   ".to_string());

    (vec![sprint, review], vec![project])
  }

  #[test]
  fn day_popup_lists_events_in_order() {
    let (tasks, projects) = fixtures();
    let popup = present_day(
      date(2024, 3, 11),
      &tasks,
      &projects
    );

    assert!(!popup.is_empty());
    assert_eq!(
      popup.heading,
      "Monday, March 11, 2024"
    );
    let titles = popup
      .events
      .iter()
      .map(|event| event.title.as_str())
      .collect::<Vec<_>>();
    assert_eq!(
      titles,
      vec!["Sprint", "Review"]
    );

    let sprint = &popup.events[0];
    assert_eq!(
      sprint.project,
      Some(ProjectLabel {
        name:  "Website".to_string(),
        color: ProjectColor::Teal
      })
    );
    assert_eq!(
      sprint.description.as_deref(),
      Some("ship it")
    );
    assert_eq!(
      sprint.date_line.as_deref(),
      Some(
        "Start: 2024-03-10 · Due: \
         2024-03-12"
      )
    );
    assert_eq!(
      sprint.open,
      CalendarIntent::OpenTaskDetail(
        tasks[0].id.clone()
      )
    );
    assert_eq!(
      popup.events[1].description,
      None
    );
  }

  #[test]
  fn empty_day_has_zero_state_and_new_task_intent()
  {
    let day = date(2024, 3, 20);
    let popup = present_day(day, &[], &[]);
    assert!(popup.is_empty());
    assert_eq!(
      popup.empty_message(),
      Some(EMPTY_DAY_MESSAGE)
    );
    assert_eq!(
      popup.new_task,
      CalendarIntent::NewTaskWithDate(day)
    );
  }

  #[test]
  fn detail_offers_complete_only_when_open()
  {
    let (tasks, projects) = fixtures();

    let open = present_task(
      &tasks[0].id,
      &tasks,
      &projects
    )
    .expect("sprint detail");
    let labels = open
      .actions
      .iter()
      .map(|action| action.label)
      .collect::<Vec<_>>();
    assert_eq!(
      labels,
      vec!["edit", "delete", "complete"]
    );
    assert_eq!(
      open.priority,
      Priority::Medium
    );

    let done = present_task(
      &tasks[1].id,
      &tasks,
      &projects
    )
    .expect("review detail");
    assert!(
      done
        .actions
        .iter()
        .all(|action| action.label
          != "complete")
    );
    assert_eq!(done.project, None);
    assert_eq!(
      done.date_line.as_deref(),
      Some("Due: 2024-03-11")
    );
  }

  #[test]
  fn unknown_task_presents_nothing() {
    let (tasks, projects) = fixtures();
    assert!(
      present_task(
        "missing", &tasks, &projects
      )
      .is_none()
    );
  }
}
