use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "TRELLIS_TIMEZONE";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolves the timezone used to decide
/// what "today" is. The environment wins
/// over the configured value; UTC is the
/// last resort.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "calendar.toml")
  {
    return tz;
  }

  chrono_tz::UTC
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "invalid timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  Utc::now()
    .with_timezone(&tz)
    .date_naive()
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format(DATE_FORMAT).to_string()
}

#[must_use]
pub fn format_long_date(
  date: NaiveDate
) -> String {
  date
    .format("%A, %B %-d, %Y")
    .to_string()
}

#[must_use]
pub fn format_month_title(
  date: NaiveDate
) -> String {
  date.format("%B %Y").to_string()
}

pub fn day_name(
  weekday: Weekday
) -> &'static str {
  match weekday {
    | Weekday::Sun => "Sunday",
    | Weekday::Mon => "Monday",
    | Weekday::Tue => "Tuesday",
    | Weekday::Wed => "Wednesday",
    | Weekday::Thu => "Thursday",
    | Weekday::Fri => "Friday",
    | Weekday::Sat => "Saturday"
  }
}

pub fn short_day_name(
  weekday: Weekday
) -> &'static str {
  &day_name(weekday)[..3]
}

/// Column labels for a grid whose first
/// column is `week_start`.
pub fn weekday_labels(
  week_start: Weekday
) -> [&'static str; 7] {
  let mut labels = [""; 7];
  let mut day = week_start;
  for label in &mut labels {
    *label = short_day_name(day);
    day = day.succ();
  }
  labels
}

/// Column of `date` in a week that begins
/// on `week_start` (0..=6).
pub fn weekday_index(
  date: NaiveDate,
  week_start: Weekday
) -> u32 {
  let day_idx = date
    .weekday()
    .num_days_from_sunday();
  let start_idx =
    week_start.num_days_from_sunday();
  (7 + day_idx - start_idx) % 7
}

pub fn is_same_day(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a == b
}

/// Inclusive on both ends.
pub fn in_date_range(
  date: NaiveDate,
  start: NaiveDate,
  end: NaiveDate
) -> bool {
  start <= date && date <= end
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Moves by whole calendar months,
/// clamping the day to the target month's
/// length.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let total = date.year() as i64 * 12
    + date.month0() as i64
    + months as i64;
  let Ok(year) =
    i32::try_from(total.div_euclid(12))
  else {
    return date;
  };
  let month =
    total.rem_euclid(12) as u32 + 1;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    day,
    -(weekday_index(day, week_start)
      as i64)
  )
}

/// Reads a stored date value. Accepts a
/// plain date or a timestamp (whose time
/// of day is dropped); anything else is
/// `None`.
pub fn parse_date_text(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      DATE_FORMAT
    )
  {
    return Some(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.date_naive());
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt.date());
    }
  }

  None
}

/// Parses a user supplied date relative
/// to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_input(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let num = if &caps["sign"] == "-" {
      -num
    } else {
      num
    };

    return match &caps["unit"] {
      | "d" => Ok(add_days(today, num)),
      | "w" => {
        Ok(add_days(today, num * 7))
      }
      | "m" => {
        let months = i32::try_from(num)
          .context(
            "relative month offset \
             out of range"
          )?;
        Ok(shift_months(today, months))
      }
      | unit => {
        Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };
  }

  parse_date_text(token)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized date: {input}"
      )
    })
    .with_context(|| {
      "supported formats: \
       today/tomorrow/yesterday, \
       weekday names (e.g. friday), \
       +Nd/-Nd, +Nw/-Nw, +Nm/-Nm, \
       YYYY-MM-DD, RFC3339 timestamps"
    })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_sunday()
    as i64;
  let target_idx =
    target.num_days_from_sunday() as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

pub mod lenient_date_serde {
  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => {
          serializer.serialize_str(
            &super::super::format_date(
              *value
            )
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    /// Invalid values read as absent
    /// instead of failing the record.
    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<Option<NaiveDate>, D::Error>
    where
      D: Deserializer<'de>
    {
      let raw =
        Option::<String>::deserialize(
          deserializer
        )?;
      let Some(raw) = raw else {
        return Ok(None);
      };
      let parsed =
        super::super::parse_date_text(
          &raw
        );
      if parsed.is_none()
        && !raw.trim().is_empty()
      {
        tracing::warn!(
          value = %raw,
          "ignoring invalid stored date"
        );
      }
      Ok(parsed)
    }
  }
}
