use std::io::Write;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use super::{CommandContext, short_id};
use crate::calendar::present_task;
use crate::cli::{TaskCommand, TaskFields, join_words};
use crate::datastore::{DataStore, load_or_empty};
use crate::datetime::{format_date, parse_date_input};
use crate::intent::{CalendarIntent, IntentHandler};
use crate::render::Renderer;
use crate::task::{Status, Task};

/// Carries out calendar intents against the datastore and reports the
/// outcome on `out`.
pub struct StoreIntents<'a, W: Write> {
    store: &'a DataStore,
    renderer: &'a Renderer,
    out: &'a mut W,
    now: DateTime<Utc>,
    draft: Option<Task>,
}

impl<'a, W: Write> StoreIntents<'a, W> {
    pub fn new(store: &'a DataStore, renderer: &'a Renderer, out: &'a mut W, now: DateTime<Utc>) -> Self {
        Self {
            store,
            renderer,
            out,
            now,
            draft: None,
        }
    }

    /// Task to create when the next `NewTaskWithDate` arrives.
    pub fn with_draft(mut self, draft: Task) -> Self {
        self.draft = Some(draft);
        self
    }

    fn show_detail(&mut self, id: &str, edit_hint: bool) -> anyhow::Result<()> {
        let task = self.store.get_task(id)?;
        let (tasks, projects) = load_or_empty(self.store);
        let detail = present_task(&task.id, &tasks, &projects)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        self.renderer.write_task_detail(&mut *self.out, &detail)?;
        if edit_hint {
            writeln!(
                self.out,
                "edit with: trellis task edit {} [--title T] [--start D] [--due D] \
                 [--priority p] [--project P] [--description T]",
                &task.id
            )?;
        }
        Ok(())
    }
}

impl<W: Write> IntentHandler for StoreIntents<'_, W> {
    #[instrument(skip(self, intent), fields(kind = intent.label(), task = intent.task_id()))]
    fn handle(&mut self, intent: CalendarIntent) -> anyhow::Result<()> {
        match intent {
            CalendarIntent::OpenTaskDetail(id) => self.show_detail(&id, false),
            CalendarIntent::OpenEditTask(id) => self.show_detail(&id, true),
            CalendarIntent::CompleteTask(id) => {
                let task = self.store.set_task_status(&id, Status::Completed, self.now)?;
                writeln!(self.out, "Completed task {} '{}'.", short_id(&task.id), task.title)?;
                Ok(())
            }
            CalendarIntent::DeleteTask(id) => {
                let task = self.store.get_task(&id)?;
                let comments = self.store.delete_task(&task.id)?;
                writeln!(
                    self.out,
                    "Deleted task {} '{}' ({comments} comments).",
                    short_id(&task.id),
                    task.title
                )?;
                Ok(())
            }
            CalendarIntent::NewTaskWithDate(date) => {
                let mut task = self
                    .draft
                    .take()
                    .ok_or_else(|| anyhow!("no task details given for {}", format_date(date)))?;
                task.start_date = Some(date);
                ensure_ordered(task.start_date, task.due_date)?;
                let task = self.store.add_task(task)?;
                writeln!(
                    self.out,
                    "Created task {} starting {}.",
                    short_id(&task.id),
                    format_date(date)
                )?;
                Ok(())
            }
        }
    }
}

#[instrument(skip(ctx, command, out))]
pub(super) fn cmd_task<W: Write>(
    ctx: &CommandContext<'_>,
    command: TaskCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        TaskCommand::Add { title, fields } => {
            info!("command task add");
            let task = draft_task(ctx, &title, &fields)?;
            ensure_ordered(task.start_date, task.due_date)?;
            let task = ctx.store.add_task(task)?;
            writeln!(out, "Created task {}.", short_id(&task.id))?;
            Ok(())
        }
        TaskCommand::NewOn { date, title, fields } => {
            info!("command task new-on");
            if fields.start.is_some() {
                return Err(anyhow!("new-on sets the start date itself; drop --start"));
            }
            let date = parse_date_input(&date, ctx.today)?;
            let draft = draft_task(ctx, &title, &fields)?;
            intents(ctx, out)
                .with_draft(draft)
                .handle(CalendarIntent::NewTaskWithDate(date))
        }
        TaskCommand::Edit {
            id,
            title,
            fields,
            clear_start,
            clear_due,
            clear_project,
            clear_description,
        } => {
            let untouched = title.is_none()
                && fields.project.is_none()
                && fields.priority.is_none()
                && fields.start.is_none()
                && fields.due.is_none()
                && fields.description.is_none()
                && !(clear_start || clear_due || clear_project || clear_description);
            if untouched {
                return intents(ctx, out).handle(CalendarIntent::OpenEditTask(id));
            }

            info!("command task edit");
            let mut edited = ctx.store.get_task(&id)?;
            if let Some(title) = title {
                edited.title = non_empty_title(&title)?;
            }
            apply_fields(ctx, &mut edited, &fields)?;
            if clear_start {
                edited.start_date = None;
            }
            if clear_due {
                edited.due_date = None;
            }
            if clear_project {
                edited.project_id = None;
            }
            if clear_description {
                edited.description = None;
            }
            ensure_ordered(edited.start_date, edited.due_date)?;

            let full_id = edited.id.clone();
            let task = ctx
                .store
                .update_task(&full_id, ctx.now, move |stored| *stored = edited)?;
            writeln!(out, "Modified task {}.", short_id(&task.id))?;
            Ok(())
        }
        TaskCommand::Status { id, status } => {
            let task = ctx.store.set_task_status(&id, status, ctx.now)?;
            writeln!(out, "Task {} is now {}.", short_id(&task.id), task.status.label())?;
            Ok(())
        }
        TaskCommand::Done { id } => intents(ctx, out).handle(CalendarIntent::CompleteTask(id)),
        TaskCommand::Delete { id } => intents(ctx, out).handle(CalendarIntent::DeleteTask(id)),
        TaskCommand::Show { id } => intents(ctx, out).handle(CalendarIntent::OpenTaskDetail(id)),
        TaskCommand::List { project, status } => {
            let (tasks, projects) = load_or_empty(ctx.store);
            let project_id = match project.as_deref() {
                Some(raw) => Some(ctx.store.resolve_project(raw)?.id),
                None => None,
            };
            let shown = tasks
                .into_iter()
                .filter(|task| project_id.is_none() || task.project_id == project_id)
                .filter(|task| status.is_none_or(|wanted| task.status == wanted))
                .collect::<Vec<_>>();
            ctx.renderer
                .write_task_table(out, &shown, &projects, ctx.today)
        }
    }
}

fn intents<'a, W: Write>(ctx: &CommandContext<'a>, out: &'a mut W) -> StoreIntents<'a, W> {
    StoreIntents::new(ctx.store, ctx.renderer, out, ctx.now)
}

fn draft_task(ctx: &CommandContext<'_>, title: &[String], fields: &TaskFields) -> anyhow::Result<Task> {
    let title = non_empty_title(&join_words(title))?;
    let mut task = Task::new_pending(&ctx.store.workspace_id, title, ctx.now);
    apply_fields(ctx, &mut task, fields)?;
    Ok(task)
}

fn apply_fields(ctx: &CommandContext<'_>, task: &mut Task, fields: &TaskFields) -> anyhow::Result<()> {
    if let Some(raw) = fields.project.as_deref() {
        task.project_id = Some(ctx.store.resolve_project(raw)?.id);
    }
    if let Some(priority) = fields.priority {
        task.priority = priority;
    }
    if let Some(raw) = fields.start.as_deref() {
        task.start_date = Some(parse_date_input(raw, ctx.today)?);
    }
    if let Some(raw) = fields.due.as_deref() {
        task.due_date = Some(parse_date_input(raw, ctx.today)?);
    }
    if let Some(text) = fields.description.as_deref() {
        let text = text.trim();
        task.description = (!text.is_empty()).then(|| text.to_string());
    }
    Ok(())
}

fn non_empty_title(raw: &str) -> anyhow::Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(anyhow!("task title cannot be empty"));
    }
    Ok(title.to_string())
}

/// Start after due is refused at input time; the calendar would never show it.
fn ensure_ordered(start: Option<NaiveDate>, due: Option<NaiveDate>) -> anyhow::Result<()> {
    if let (Some(start), Some(due)) = (start, due) {
        if start > due {
            warn!(%start, %due, "rejected inverted date range");
            return Err(anyhow!(
                "start date {} is after due date {}",
                format_date(start),
                format_date(due)
            ));
        }
    }
    Ok(())
}
