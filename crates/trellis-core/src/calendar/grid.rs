use std::collections::BTreeMap;

use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};

use super::events::task_matches_date;
use super::policy::CalendarConfig;
use super::view_state::{
  ViewMode,
  ViewState
};
use crate::datetime::{
  add_days,
  first_day_of_month,
  format_month_title,
  start_of_week,
  weekday_labels
};
use crate::task::{
  Project,
  ProjectColor,
  Task
};

pub const MONTH_GRID_CELLS: usize = 42;
pub const WEEK_GRID_CELLS: usize = 7;

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct EventMarker {
  pub task_id: String,
  pub color:   ProjectColor
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct CalendarCell {
  pub date:          NaiveDate,
  /// False for the leading/trailing days
  /// of neighbouring months.
  pub in_period:     bool,
  pub is_today:      bool,
  pub is_selected:   bool,
  /// Every matching task, in collection
  /// order.
  pub task_ids:      Vec<String>,
  pub markers:       Vec<EventMarker>,
  pub overflow_dots: usize
}

impl CalendarCell {
  pub fn event_count(&self) -> usize {
    self.task_ids.len()
  }

  pub fn is_other_month(&self) -> bool {
    !self.in_period
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct CalendarGrid {
  pub mode:           ViewMode,
  pub title:          String,
  pub weekday_labels: [&'static str; 7],
  pub period_start:   NaiveDate,
  pub period_end:     NaiveDate,
  /// Most dots any cell can carry:
  /// primary plus overflow.
  pub dot_capacity:   usize,
  pub cells:          Vec<CalendarCell>
}

impl CalendarGrid {
  pub fn rows(
    &self
  ) -> impl Iterator<Item = &[CalendarCell]>
  {
    self.cells.chunks(7)
  }

  pub fn cell(
    &self,
    date: NaiveDate
  ) -> Option<&CalendarCell> {
    self
      .cells
      .iter()
      .find(|cell| cell.date == date)
  }
}

/// Inputs shared by both grid shapes.
#[derive(Debug, Clone, Copy)]
pub struct GridContext<'a> {
  pub tasks:    &'a [Task],
  pub projects: &'a [Project],
  pub today:    NaiveDate,
  pub config:   &'a CalendarConfig
}

/// How many primary dots and overflow
/// dots to draw for `count` events.
pub fn marker_caps(
  count: usize,
  primary_limit: usize,
  overflow_limit: usize
) -> (usize, usize) {
  let shown = count.min(primary_limit);
  let overflow = count
    .saturating_sub(primary_limit)
    .min(overflow_limit);
  (shown, overflow)
}

pub fn build_grid(
  state: &ViewState,
  ctx: &GridContext<'_>
) -> CalendarGrid {
  match state.mode {
    | ViewMode::Month => {
      build_month_grid(state, ctx)
    }
    | ViewMode::Week => {
      build_week_grid(state, ctx)
    }
  }
}

/// Fixed 6x7 grid around the anchor's
/// month.
#[tracing::instrument(skip_all, fields(anchor = %state.anchor))]
pub fn build_month_grid(
  state: &ViewState,
  ctx: &GridContext<'_>
) -> CalendarGrid {
  let week_start =
    ctx.config.week_start();
  let focus = state.anchor;
  let first = first_day_of_month(
    focus.year(),
    focus.month()
  );
  let grid_start =
    start_of_week(first, week_start);
  let (period_start, period_end) =
    state.visible_range(week_start);
  let colors = project_colors(
    ctx.projects
  );

  let cells = (0..MONTH_GRID_CELLS
    as i64)
    .map(|offset| {
      let day =
        add_days(grid_start, offset);
      let in_period = day.year()
        == focus.year()
        && day.month() == focus.month();
      build_cell(
        day,
        in_period,
        state,
        ctx,
        &colors,
        ctx.config.policies.month_dot_limit
      )
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    cells = cells.len(),
    leading = (first - grid_start)
      .num_days(),
    "built month grid"
  );

  CalendarGrid {
    mode: ViewMode::Month,
    title: format_month_title(focus),
    weekday_labels: weekday_labels(
      week_start
    ),
    period_start,
    period_end,
    dot_capacity: ctx
      .config
      .policies
      .month_dot_limit
      + ctx
        .config
        .policies
        .overflow_dot_limit,
    cells
  }
}

#[tracing::instrument(skip_all, fields(anchor = %state.anchor))]
pub fn build_week_grid(
  state: &ViewState,
  ctx: &GridContext<'_>
) -> CalendarGrid {
  let week_start =
    ctx.config.week_start();
  let (start, end) =
    state.week_range(week_start);
  let colors = project_colors(
    ctx.projects
  );

  let cells = (0..WEEK_GRID_CELLS
    as i64)
    .map(|offset| {
      build_cell(
        add_days(start, offset),
        true,
        state,
        ctx,
        &colors,
        ctx.config.policies.week_dot_limit
      )
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    %start,
    %end,
    "built week grid"
  );

  CalendarGrid {
    mode: ViewMode::Week,
    title: week_title(start, end),
    weekday_labels: weekday_labels(
      week_start
    ),
    period_start: start,
    period_end: end,
    dot_capacity: ctx
      .config
      .policies
      .week_dot_limit
      + ctx
        .config
        .policies
        .overflow_dot_limit,
    cells
  }
}

pub fn week_title(
  start: NaiveDate,
  end: NaiveDate
) -> String {
  if start.year() == end.year() {
    format!(
      "{} - {}, {}",
      start.format("%b %-d"),
      end.format("%b %-d"),
      end.year()
    )
  } else {
    format!(
      "{} - {}",
      start.format("%b %-d, %Y"),
      end.format("%b %-d, %Y")
    )
  }
}

fn build_cell(
  date: NaiveDate,
  in_period: bool,
  state: &ViewState,
  ctx: &GridContext<'_>,
  colors: &BTreeMap<&str, ProjectColor>,
  primary_limit: usize
) -> CalendarCell {
  let matched = ctx
    .tasks
    .iter()
    .filter(|task| {
      task_matches_date(task, date)
    })
    .collect::<Vec<_>>();
  let (shown, overflow_dots) =
    marker_caps(
      matched.len(),
      primary_limit,
      ctx
        .config
        .policies
        .overflow_dot_limit
    );

  let markers = matched
    .iter()
    .take(shown)
    .map(|task| {
      EventMarker {
        task_id: task.id.clone(),
        color:   marker_color(
          task, colors
        )
      }
    })
    .collect();

  if !matched.is_empty() {
    tracing::trace!(
      %date,
      events = matched.len(),
      overflow_dots,
      "cell events"
    );
  }

  CalendarCell {
    date,
    in_period,
    is_today: date == ctx.today,
    is_selected: state.selected
      == Some(date),
    task_ids: matched
      .iter()
      .map(|task| task.id.clone())
      .collect(),
    markers,
    overflow_dots
  }
}

fn project_colors(
  projects: &[Project]
) -> BTreeMap<&str, ProjectColor> {
  projects
    .iter()
    .map(|project| {
      (project.id.as_str(), project.color)
    })
    .collect()
}

fn marker_color(
  task: &Task,
  colors: &BTreeMap<&str, ProjectColor>
) -> ProjectColor {
  task
    .project_id
    .as_deref()
    .and_then(|id| colors.get(id))
    .copied()
    .unwrap_or(ProjectColor::Gray)
}

/// Leading other-month cells of a month
/// grid.
pub fn leading_cells(
  anchor: NaiveDate,
  week_start: Weekday
) -> usize {
  crate::datetime::weekday_index(
    first_day_of_month(
      anchor.year(),
      anchor.month()
    ),
    week_start
  ) as usize
}
