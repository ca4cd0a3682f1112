mod records;
mod task_ops;
mod views;

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};

use crate::calendar::CalendarConfig;
use crate::cli::Command;
use crate::datastore::DataStore;
use crate::render::Renderer;

pub use self::task_ops::StoreIntents;

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub store: &'a DataStore,
    pub renderer: &'a Renderer,
    pub calendar: &'a CalendarConfig,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

#[instrument(skip(ctx, command, out), fields(today = %ctx.today))]
pub fn dispatch<W: Write>(
    ctx: &CommandContext<'_>,
    command: Option<Command>,
    out: &mut W,
) -> anyhow::Result<()> {
    let command = command.unwrap_or_else(|| Command::Calendar(Default::default()));
    debug!(?command, "dispatching command");

    match command {
        Command::Calendar(args) => views::cmd_calendar(ctx, &args, out),
        Command::Day { date } => views::cmd_day(ctx, &date, out),
        Command::Dashboard => views::cmd_dashboard(ctx, out),
        Command::Task(task) => task_ops::cmd_task(ctx, task, out),
        Command::Project(project) => records::cmd_project(ctx, project, out),
        Command::Comment(comment) => records::cmd_comment(ctx, comment, out),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
