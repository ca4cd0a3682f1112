//! Month and week calendar over the
//! workspace's tasks.
//!
//! Everything here is a pure projection:
//! the controller owns the current
//! [`ViewState`], and every render
//! rebuilds the grid from explicit task
//! and project slices. Painting lives in
//! [`crate::render`].

pub mod events;
pub mod grid;
pub mod policy;
pub mod presenter;
pub mod view_state;

use chrono::{
  NaiveDate,
  Weekday
};

pub use self::events::{
  events_for_date,
  events_for_date_text,
  period_tasks,
  task_matches_date
};
pub use self::grid::{
  CalendarCell,
  CalendarGrid,
  EventMarker,
  GridContext,
  build_grid
};
pub use self::policy::CalendarConfig;
pub use self::presenter::{
  DayPopup,
  TaskDetail,
  present_day,
  present_task
};
pub use self::view_state::{
  Navigation,
  ViewMode,
  ViewState
};
use crate::task::{
  Project,
  Status,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct PeriodStats {
  pub total:       usize,
  pub pending:     usize,
  pub in_progress: usize,
  pub completed:   usize
}

impl PeriodStats {
  fn push(&mut self, status: Status) {
    self.total =
      self.total.saturating_add(1);
    match status {
      | Status::Pending => {
        self.pending =
          self.pending.saturating_add(1);
      }
      | Status::InProgress => {
        self.in_progress = self
          .in_progress
          .saturating_add(1);
      }
      | Status::Completed => {
        self.completed = self
          .completed
          .saturating_add(1);
      }
    }
  }
}

/// Holds the latest view state and hands
/// out freshly computed models.
#[derive(Debug, Clone)]
pub struct CalendarView {
  state:  ViewState,
  config: CalendarConfig,
  today:  NaiveDate
}

impl CalendarView {
  pub fn new(
    config: CalendarConfig,
    today: NaiveDate
  ) -> Self {
    Self {
      state: ViewState::new(today),
      config,
      today
    }
  }

  pub fn with_state(
    config: CalendarConfig,
    state: ViewState,
    today: NaiveDate
  ) -> Self {
    Self {
      state,
      config,
      today
    }
  }

  pub fn state(&self) -> &ViewState {
    &self.state
  }

  pub fn config(
    &self
  ) -> &CalendarConfig {
    &self.config
  }

  pub fn today(&self) -> NaiveDate {
    self.today
  }

  pub fn week_start(&self) -> Weekday {
    self.config.week_start()
  }

  pub fn apply(
    &mut self,
    navigation: Navigation
  ) {
    self.state = self
      .state
      .apply(navigation, self.today);
  }

  /// Tasks whose status the visibility
  /// policy lets through.
  pub fn visible_tasks(
    &self,
    tasks: &[Task]
  ) -> Vec<Task> {
    tasks
      .iter()
      .filter(|task| {
        self
          .config
          .visibility
          .allows(task.status)
      })
      .cloned()
      .collect()
  }

  pub fn grid(
    &self,
    tasks: &[Task],
    projects: &[Project]
  ) -> CalendarGrid {
    let visible =
      self.visible_tasks(tasks);
    build_grid(
      &self.state,
      &GridContext {
        tasks: &visible,
        projects,
        today: self.today,
        config: &self.config
      }
    )
  }

  pub fn day_popup(
    &self,
    date: NaiveDate,
    tasks: &[Task],
    projects: &[Project]
  ) -> DayPopup {
    present_day(
      date,
      &self.visible_tasks(tasks),
      projects
    )
  }

  /// Popup for the selected date, if any.
  pub fn selected_popup(
    &self,
    tasks: &[Task],
    projects: &[Project]
  ) -> Option<DayPopup> {
    self.state.selected.map(|date| {
      self.day_popup(
        date, tasks, projects
      )
    })
  }

  pub fn task_detail(
    &self,
    task_id: &str,
    tasks: &[Task],
    projects: &[Project]
  ) -> Option<TaskDetail> {
    present_task(
      task_id, tasks, projects
    )
  }

  pub fn visible_range(
    &self
  ) -> (NaiveDate, NaiveDate) {
    self
      .state
      .visible_range(self.week_start())
  }

  /// Tasks touching the visible period,
  /// in collection order.
  pub fn period_tasks(
    &self,
    tasks: &[Task]
  ) -> Vec<Task> {
    let (start, end) =
      self.visible_range();
    let visible =
      self.visible_tasks(tasks);
    period_tasks(&visible, start, end)
      .into_iter()
      .cloned()
      .collect()
  }

  pub fn period_stats(
    &self,
    tasks: &[Task]
  ) -> PeriodStats {
    let mut stats =
      PeriodStats::default();
    for task in self.period_tasks(tasks)
    {
      stats.push(task.status);
    }
    stats
  }

  pub fn title(&self) -> String {
    match self.state.mode {
      | ViewMode::Month => {
        crate::datetime::format_month_title(
          self.state.anchor
        )
      }
      | ViewMode::Week => {
        let (start, end) = self
          .state
          .week_range(self.week_start());
        grid::week_title(start, end)
      }
    }
  }
}
