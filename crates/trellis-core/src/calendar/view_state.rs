use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};

use crate::datetime::{
  add_days,
  first_day_of_month,
  last_day_of_month,
  shift_months,
  start_of_week
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ViewMode {
  Month,
  Week
}

impl ViewMode {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" | "m" => Some(Self::Month),
      | "week" | "w" => Some(Self::Week),
      | _ => None
    }
  }
}

impl FromStr for ViewMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| {
      anyhow!(
        "invalid calendar view: {s} \
         (expected month or week)"
      )
    })
  }
}

impl fmt::Display for ViewMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

/// User driven transitions of the
/// calendar view.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Navigation {
  Prev,
  Next,
  Today,
  Mode(ViewMode),
  Select(NaiveDate)
}

/// Transient view state. Every
/// transition consumes the old value and
/// returns the next one.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct ViewState {
  pub mode:     ViewMode,
  pub anchor:   NaiveDate,
  pub selected: Option<NaiveDate>
}

impl ViewState {
  pub fn new(today: NaiveDate) -> Self {
    Self {
      mode:     ViewMode::Month,
      anchor:   today,
      selected: None
    }
  }

  #[must_use]
  pub fn switch_mode(
    self,
    mode: ViewMode
  ) -> Self {
    Self { mode, ..self }
  }

  /// One month or one week per step,
  /// depending on the mode.
  #[must_use]
  pub fn advance(self, step: i32) -> Self {
    let anchor = match self.mode {
      | ViewMode::Month => {
        shift_months(self.anchor, step)
      }
      | ViewMode::Week => {
        add_days(
          self.anchor,
          i64::from(step) * 7
        )
      }
    };
    Self { anchor, ..self }
  }

  #[must_use]
  pub fn go_to_today(
    self,
    today: NaiveDate
  ) -> Self {
    Self {
      anchor: today,
      ..self
    }
  }

  #[must_use]
  pub fn select_date(
    self,
    date: NaiveDate
  ) -> Self {
    Self {
      selected: Some(date),
      ..self
    }
  }

  #[must_use]
  pub fn apply(
    self,
    navigation: Navigation,
    today: NaiveDate
  ) -> Self {
    tracing::debug!(
      ?navigation,
      mode = %self.mode,
      anchor = %self.anchor,
      "calendar navigation"
    );
    match navigation {
      | Navigation::Prev => {
        self.advance(-1)
      }
      | Navigation::Next => {
        self.advance(1)
      }
      | Navigation::Today => {
        self.go_to_today(today)
      }
      | Navigation::Mode(mode) => {
        self.switch_mode(mode)
      }
      | Navigation::Select(date) => {
        self.select_date(date)
      }
    }
  }

  /// Week containing the anchor, computed
  /// fresh from the current anchor.
  pub fn week_range(
    &self,
    week_start: Weekday
  ) -> (NaiveDate, NaiveDate) {
    let start = start_of_week(
      self.anchor,
      week_start
    );
    (start, add_days(start, 6))
  }

  /// Dates that belong to the current
  /// period (the focused month, or the
  /// anchor's week).
  pub fn visible_range(
    &self,
    week_start: Weekday
  ) -> (NaiveDate, NaiveDate) {
    match self.mode {
      | ViewMode::Month => {
        (
          first_day_of_month(
            self.anchor.year(),
            self.anchor.month()
          ),
          last_day_of_month(
            self.anchor.year(),
            self.anchor.month()
          )
        )
      }
      | ViewMode::Week => {
        self.week_range(week_start)
      }
    }
  }
}
