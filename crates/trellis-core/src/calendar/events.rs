use chrono::NaiveDate;

use crate::datetime::{
  in_date_range,
  is_same_day,
  parse_date_text
};
use crate::task::Task;

/// Whether `task` occupies `date` on the
/// calendar.
///
/// With both dates set the task covers
/// the closed interval between them. A
/// lone start or due date covers only
/// that day. An inverted interval (start
/// after due) covers nothing.
pub fn task_matches_date(
  task: &Task,
  date: NaiveDate
) -> bool {
  if task.has_inverted_interval() {
    tracing::debug!(
      task = %task.id,
      start = ?task.start_date,
      due = ?task.due_date,
      "inverted interval never matches"
    );
    return false;
  }

  match (task.start_date, task.due_date)
  {
    | (Some(start), Some(due)) => {
      in_date_range(date, start, due)
    }
    | (Some(start), None) => {
      is_same_day(date, start)
    }
    | (None, Some(due)) => {
      is_same_day(date, due)
    }
    | (None, None) => false
  }
}

/// Tasks covering `date`, in collection
/// order.
pub fn events_for_date(
  date: NaiveDate,
  tasks: &[Task]
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|task| {
      task_matches_date(task, date)
    })
    .collect()
}

/// Same as [`events_for_date`] for a raw
/// date value; anything unparseable
/// matches nothing.
pub fn events_for_date_text<'a>(
  raw: &str,
  tasks: &'a [Task]
) -> Vec<&'a Task> {
  match parse_date_text(raw) {
    | Some(date) => {
      events_for_date(date, tasks)
    }
    | None => {
      tracing::debug!(
        input = raw,
        "invalid date has no events"
      );
      Vec::new()
    }
  }
}

/// Whether any day `task` covers falls
/// inside `[start, end]`.
pub fn task_overlaps_range(
  task: &Task,
  start: NaiveDate,
  end: NaiveDate
) -> bool {
  if task.has_inverted_interval() {
    return false;
  }

  let (first, last) = match task
    .interval()
  {
    | Some(interval) => interval,
    | None => {
      match task
        .start_date
        .or(task.due_date)
      {
        | Some(day) => (day, day),
        | None => return false
      }
    }
  };
  first <= end && start <= last
}

/// Tasks with at least one day inside
/// `[start, end]`, in collection order.
pub fn period_tasks(
  tasks: &[Task],
  start: NaiveDate,
  end: NaiveDate
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|task| {
      task_overlaps_range(
        task, start, end
      )
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::*;
  use crate::datetime::add_days;

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
    start: Option<NaiveDate>,
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
    task.start_date = start;
    task.due_date = due;
    task
  }

  #[test]
  fn closed_interval_matches_every_day_inside()
  {
    let tasks = vec![task(
      "Sprint",
      Some(date(2024, 3, 10)),
      Some(date(2024, 3, 12))
    )];

    for day in 10..=12 {
      assert_eq!(
        events_for_date(
          date(2024, 3, day),
          &tasks
        )
        .len(),
        1,
        "day {day}"
      );
    }
    assert!(
      events_for_date(
        date(2024, 3, 9),
        &tasks
      )
      .is_empty()
    );
    assert!(
      events_for_date(
        date(2024, 3, 13),
        &tasks
      )
      .is_empty()
    );
  }

  #[test]
  fn interval_spanning_year_end() {
    let tasks = vec![task(
      "Holidays",
      Some(date(2023, 12, 30)),
      Some(date(2024, 1, 2))
    )];
    let start = date(2023, 12, 28);
    let hits = (0..8)
      .map(|offset| add_days(start, offset))
      .filter(|day| {
        !events_for_date(*day, &tasks)
          .is_empty()
      })
      .count();
    assert_eq!(hits, 4);
  }

  #[test]
  fn single_endpoint_matches_only_that_day()
  {
    let due_only = vec![task(
      "Report",
      None,
      Some(date(2024, 3, 20))
    )];
    let start_only = vec![task(
      "Kickoff",
      Some(date(2024, 3, 4)),
      None
    )];

    assert_eq!(
      events_for_date(
        date(2024, 3, 20),
        &due_only
      )
      .len(),
      1
    );
    assert!(
      events_for_date(
        date(2024, 3, 21),
        &due_only
      )
      .is_empty()
    );
    assert_eq!(
      events_for_date(
        date(2024, 3, 4),
        &start_only
      )
      .len(),
      1
    );
    assert!(
      events_for_date(
        date(2024, 3, 5),
        &start_only
      )
      .is_empty()
    );
  }

  #[test]
  fn undated_and_inverted_tasks_never_match()
  {
    let tasks = vec![
      task("Someday", None, None),
      task(
        "Backwards",
        Some(date(2024, 3, 12)),
        Some(date(2024, 3, 10))
      ),
    ];
    for day in 9..=13 {
      assert!(
        events_for_date(
          date(2024, 3, day),
          &tasks
        )
        .is_empty()
      );
    }
  }

  #[test]
  fn preserves_collection_order() {
    let day = date(2024, 3, 11);
    let tasks = vec![
      task("zeta", None, Some(day)),
      task(
        "alpha",
        Some(date(2024, 3, 1)),
        Some(date(2024, 3, 31))
      ),
      task("mid", Some(day), None),
    ];

    let titles = events_for_date(
      day, &tasks
    )
    .into_iter()
    .map(|task| task.title.as_str())
    .collect::<Vec<_>>();
    assert_eq!(
      titles,
      vec!["zeta", "alpha", "mid"]
    );
  }

  #[test]
  fn raw_dates_are_truncated_or_rejected()
  {
    let tasks = vec![task(
      "Review",
      None,
      Some(date(2024, 3, 10))
    )];
    assert_eq!(
      events_for_date_text(
        "2024-03-10T18:45:00Z",
        &tasks
      )
      .len(),
      1
    );
    assert!(
      events_for_date_text(
        "tenth of march",
        &tasks
      )
      .is_empty()
    );
    assert!(
      events_for_date_text("", &[])
        .is_empty()
    );
  }

  #[test]
  fn period_overlap_includes_partial_intervals()
  {
    let tasks = vec![
      task(
        "Straddles",
        Some(date(2024, 2, 27)),
        Some(date(2024, 3, 2))
      ),
      task(
        "Before",
        None,
        Some(date(2024, 2, 29))
      ),
      task(
        "Inside",
        Some(date(2024, 3, 15)),
        None
      ),
    ];
    let titles = period_tasks(
      &tasks,
      date(2024, 3, 1),
      date(2024, 3, 31)
    )
    .into_iter()
    .map(|task| task.title.as_str())
    .collect::<Vec<_>>();
    assert_eq!(
      titles,
      vec!["Straddles", "Inside"]
    );
  }

  #[test]
  fn period_overlap_skips_inverted_and_undated()
  {
    let tasks = vec![
      task(
        "Backwards",
        Some(date(2024, 3, 20)),
        Some(date(2024, 3, 5))
      ),
      task("Someday", None, None),
      task(
        "Closed",
        Some(date(2024, 3, 5)),
        Some(date(2024, 3, 20))
      ),
    ];
    assert!(
      !task_overlaps_range(
        &tasks[0],
        date(2024, 3, 1),
        date(2024, 3, 31)
      )
    );
    assert!(
      !task_overlaps_range(
        &tasks[1],
        date(2024, 3, 1),
        date(2024, 3, 31)
      )
    );
    let titles = period_tasks(
      &tasks,
      date(2024, 3, 1),
      date(2024, 3, 31)
    )
    .into_iter()
    .map(|task| task.title.as_str())
    .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Closed"]);
  }
}
