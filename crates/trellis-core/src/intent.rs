use chrono::NaiveDate;

/// Requests the calendar hands to the
/// task management side. The calendar
/// never mutates tasks itself.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum CalendarIntent {
  OpenTaskDetail(String),
  OpenEditTask(String),
  CompleteTask(String),
  DeleteTask(String),
  NewTaskWithDate(NaiveDate)
}

impl CalendarIntent {
  pub fn label(&self) -> &'static str {
    match self {
      | Self::OpenTaskDetail(_) => "open",
      | Self::OpenEditTask(_) => "edit",
      | Self::CompleteTask(_) => {
        "complete"
      }
      | Self::DeleteTask(_) => "delete",
      | Self::NewTaskWithDate(_) => {
        "new task"
      }
    }
  }

  pub fn task_id(&self) -> Option<&str> {
    match self {
      | Self::OpenTaskDetail(id)
      | Self::OpenEditTask(id)
      | Self::CompleteTask(id)
      | Self::DeleteTask(id) => {
        Some(id.as_str())
      }
      | Self::NewTaskWithDate(_) => None
    }
  }
}

pub trait IntentHandler {
  fn handle(
    &mut self,
    intent: CalendarIntent
  ) -> anyhow::Result<()>;
}
