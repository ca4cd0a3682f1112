use std::io::Write;

use tracing::{info, instrument};

use super::CommandContext;
use crate::calendar::{CalendarView, Navigation, ViewMode, ViewState};
use crate::cli::CalendarArgs;
use crate::dashboard::Dashboard;
use crate::datastore::load_or_empty;
use crate::datetime::parse_date_input;

#[instrument(skip(ctx, args, out))]
pub(super) fn cmd_calendar<W: Write>(
    ctx: &CommandContext<'_>,
    args: &CalendarArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command calendar");

    let mode = args.view.unwrap_or(ViewMode::Month);
    let anchor = match args.date.as_deref() {
        Some(raw) => parse_date_input(raw, ctx.today)?,
        None => ctx.today,
    };

    let state = ViewState::new(anchor).switch_mode(mode);
    let mut view = CalendarView::with_state(ctx.calendar.clone(), state, ctx.today);
    for _ in 0..args.prev {
        view.apply(Navigation::Prev);
    }
    for _ in 0..args.next {
        view.apply(Navigation::Next);
    }
    if let Some(raw) = args.select.as_deref() {
        view.apply(Navigation::Select(parse_date_input(raw, ctx.today)?));
    }

    let (tasks, projects) = load_or_empty(ctx.store);
    let grid = view.grid(&tasks, &projects);
    ctx.renderer.write_grid(out, &grid)?;

    writeln!(out)?;
    let period = view.period_tasks(&tasks);
    ctx.renderer
        .write_period(out, &period, &view.period_stats(&tasks))?;

    if let Some(popup) = view.selected_popup(&tasks, &projects) {
        writeln!(out)?;
        ctx.renderer.write_day_popup(out, &popup)?;
    }

    Ok(())
}

#[instrument(skip(ctx, out))]
pub(super) fn cmd_day<W: Write>(
    ctx: &CommandContext<'_>,
    raw: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let date = parse_date_input(raw, ctx.today)?;
    info!(%date, "command day");

    let view = CalendarView::new(ctx.calendar.clone(), ctx.today);
    let (tasks, projects) = load_or_empty(ctx.store);
    let popup = view.day_popup(date, &tasks, &projects);
    ctx.renderer.write_day_popup(out, &popup)
}

#[instrument(skip(ctx, out))]
pub(super) fn cmd_dashboard<W: Write>(
    ctx: &CommandContext<'_>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command dashboard");

    let (tasks, projects) = load_or_empty(ctx.store);
    let dash = Dashboard::build(&tasks, &projects, ctx.today);
    ctx.renderer.write_dashboard(out, &dash)
}
