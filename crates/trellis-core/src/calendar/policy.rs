use std::fs;
use std::path::Path;

use chrono::Weekday;
use serde::{
  Deserialize,
  Serialize
};

use crate::task::Status;

fn calendar_true() -> bool {
  true
}

fn calendar_default_week_start()
-> String {
  "sunday".to_string()
}

fn calendar_default_month_dot_limit()
-> usize {
  3
}

fn calendar_default_week_dot_limit()
-> usize {
  6
}

fn calendar_default_overflow_dot_limit()
-> usize {
  3
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarConfig {
  #[serde(default)]
  pub version:    u32,
  #[serde(default)]
  pub timezone:   Option<String>,
  #[serde(default)]
  pub policies:   CalendarPolicies,
  #[serde(default)]
  pub visibility: CalendarVisibility
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarPolicies {
  #[serde(
    default = "calendar_default_week_start"
  )]
  pub week_start:         String,
  /// Event dots drawn in a month cell.
  #[serde(
    default = "calendar_default_month_dot_limit"
  )]
  pub month_dot_limit:    usize,
  /// Event dots drawn in a week cell.
  #[serde(
    default = "calendar_default_week_dot_limit"
  )]
  pub week_dot_limit:     usize,
  /// Second tier: dots standing in for
  /// events beyond the primary limit.
  #[serde(
    default = "calendar_default_overflow_dot_limit"
  )]
  pub overflow_dot_limit: usize
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CalendarVisibility {
  #[serde(default = "calendar_true")]
  pub pending:     bool,
  #[serde(default = "calendar_true")]
  pub in_progress: bool,
  #[serde(default = "calendar_true")]
  pub completed:   bool
}

impl CalendarVisibility {
  pub fn allows(
    &self,
    status: Status
  ) -> bool {
    match status {
      | Status::Pending => self.pending,
      | Status::InProgress => {
        self.in_progress
      }
      | Status::Completed => {
        self.completed
      }
    }
  }
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      version:    1,
      timezone:   None,
      policies:
        CalendarPolicies::default(),
      visibility:
        CalendarVisibility::default()
    }
  }
}

impl Default for CalendarPolicies {
  fn default() -> Self {
    Self {
      week_start:
        calendar_default_week_start(),
      month_dot_limit:
        calendar_default_month_dot_limit(),
      week_dot_limit:
        calendar_default_week_dot_limit(),
      overflow_dot_limit:
        calendar_default_overflow_dot_limit(
        )
    }
  }
}

impl Default for CalendarVisibility {
  fn default() -> Self {
    Self {
      pending:     true,
      in_progress: true,
      completed:   true
    }
  }
}

impl CalendarConfig {
  pub fn from_toml_str(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut config =
      toml::from_str::<Self>(raw)?;
    sanitize_calendar_config(
      &mut config
    );
    Ok(config)
  }

  /// Reads the policy file, falling back
  /// to defaults when it is missing or
  /// unreadable.
  #[tracing::instrument]
  pub fn load(path: &Path) -> Self {
    if !path.exists() {
      tracing::debug!(
        file = %path.display(),
        "no calendar config; using defaults"
      );
      return Self::default();
    }

    let raw =
      match fs::read_to_string(path) {
        | Ok(raw) => raw,
        | Err(error) => {
          tracing::error!(
            file = %path.display(),
            %error,
            "failed reading calendar config; using defaults"
          );
          return Self::default();
        }
      };

    match Self::from_toml_str(&raw) {
      | Ok(config) => {
        tracing::info!(
          version = config.version,
          timezone = ?config.timezone,
          week_start = %config.policies.week_start,
          "loaded calendar config"
        );
        config
      }
      | Err(error) => {
        tracing::error!(
          file = %path.display(),
          %error,
          "failed parsing calendar config; using defaults"
        );
        Self::default()
      }
    }
  }

  pub fn week_start(&self) -> Weekday {
    calendar_week_start_day(
      &self.policies.week_start
    )
  }
}

fn sanitize_calendar_config(
  config: &mut CalendarConfig
) {
  let week_start = config
    .policies
    .week_start
    .trim()
    .to_ascii_lowercase();
  config.policies.week_start =
    match week_start.as_str() {
      | "sunday" | "monday" => week_start,
      | "" => calendar_default_week_start(),
      | other => {
        tracing::warn!(
          week_start = other,
          "unknown calendar week_start; using sunday"
        );
        calendar_default_week_start()
      }
    };

  if config.policies.month_dot_limit
    == 0
  {
    config.policies.month_dot_limit =
      calendar_default_month_dot_limit(
      );
  }

  if config.policies.week_dot_limit == 0
  {
    config.policies.week_dot_limit =
      calendar_default_week_dot_limit();
  }

  if config.policies.overflow_dot_limit
    == 0
  {
    config.policies.overflow_dot_limit =
      calendar_default_overflow_dot_limit(
      );
  }

  // Week cells always show more dots than
  // month cells.
  if config.policies.week_dot_limit
    <= config.policies.month_dot_limit
  {
    let clamped =
      config.policies.month_dot_limit + 1;
    tracing::warn!(
      week_dot_limit =
        config.policies.week_dot_limit,
      month_dot_limit =
        config.policies.month_dot_limit,
      clamped,
      "calendar week_dot_limit must exceed month_dot_limit"
    );
    config.policies.week_dot_limit =
      clamped;
  }
}

fn calendar_week_start_day(
  raw: &str
) -> Weekday {
  if raw
    .trim()
    .eq_ignore_ascii_case("monday")
  {
    Weekday::Mon
  } else {
    Weekday::Sun
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::Weekday;
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn missing_fields_take_defaults() {
    let config =
      CalendarConfig::from_toml_str(
        "[policies]\n\
         week_start = \"monday\"\n"
      )
      .expect("parse config");

    assert_eq!(
      config.week_start(),
      Weekday::Mon
    );
    assert_eq!(
      config.policies.month_dot_limit,
      3
    );
    assert!(config.visibility.completed);
  }

  #[test]
  fn zero_limits_are_reset() {
    let config =
      CalendarConfig::from_toml_str(
        "[policies]\n\
         month_dot_limit = 0\n\
         week_dot_limit = 0\n\
         overflow_dot_limit = 0\n\
         week_start = \"\"\n"
      )
      .expect("parse config");

    assert_eq!(
      config.policies,
      CalendarPolicies::default()
    );
    assert_eq!(
      config.week_start(),
      Weekday::Sun
    );
  }

  #[test]
  fn unknown_week_start_falls_back_to_sunday()
  {
    let config =
      CalendarConfig::from_toml_str(
        "[policies]\n\
         week_start = \"funday\"\n"
      )
      .expect("parse config");
    assert_eq!(
      config.policies.week_start,
      "sunday"
    );
    assert_eq!(
      config.week_start(),
      Weekday::Sun
    );

    let config =
      CalendarConfig::from_toml_str(
        "[policies]\n\
         week_start = \" Monday \"\n"
      )
      .expect("parse config");
    assert_eq!(
      config.policies.week_start,
      "monday"
    );
    assert_eq!(
      config.week_start(),
      Weekday::Mon
    );
  }

  #[test]
  fn week_limit_is_kept_above_month_limit()
  {
    let config =
      CalendarConfig::from_toml_str(
        "[policies]\n\
         month_dot_limit = 5\n\
         week_dot_limit = 4\n"
      )
      .expect("parse config");
    assert_eq!(
      config.policies.month_dot_limit,
      5
    );
    assert_eq!(
      config.policies.week_dot_limit,
      6
    );

    let config =
      CalendarConfig::from_toml_str(
        "[policies]\n\
         month_dot_limit = 2\n\
         week_dot_limit = 8\n"
      )
      .expect("parse config");
    assert_eq!(
      config.policies.week_dot_limit,
      8
    );
  }

  #[test]
  fn unparseable_file_falls_back_to_defaults()
  {
    let temp = tempdir().expect("tempdir");
    let path =
      temp.path().join("calendar.toml");
    fs::write(&path, "policies = [")
      .expect("write config");

    assert_eq!(
      CalendarConfig::load(&path),
      CalendarConfig::default()
    );
  }

  #[test]
  fn visibility_filters_statuses() {
    let visibility = CalendarVisibility {
      completed: false,
      ..CalendarVisibility::default()
    };
    assert!(
      visibility.allows(Status::Pending)
    );
    assert!(
      !visibility
        .allows(Status::Completed)
    );
  }
}
