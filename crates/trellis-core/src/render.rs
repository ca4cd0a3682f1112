use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::presenter::{ProjectLabel, TaskDetail};
use crate::calendar::{CalendarCell, CalendarGrid, DayPopup, PeriodStats};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::datetime::format_date;
use crate::task::{Comment, Project, Status, Task};

/// Widest day label: `[31*]`.
const DAY_LABEL_WIDTH: usize = 5;
const CELL_GAP: usize = 2;
const MARKER: &str = "•";
const OVERFLOW: &str = "+";

/// Paints calendar and task models as text. Every method writes to the
/// caller's sink so output can be captured.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(title = %grid.title, cells = grid.cells.len()))]
    pub fn write_grid<W: Write>(&self, out: &mut W, grid: &CalendarGrid) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&grid.title, "1"))?;

        let width = grid.dot_capacity.max(DAY_LABEL_WIDTH) + CELL_GAP;
        let header = grid
            .weekday_labels
            .iter()
            .map(|label| pad(label, width))
            .collect::<String>();
        writeln!(out, "{}", self.paint(header.trim_end(), "36"))?;

        for row in grid.rows() {
            let days = row
                .iter()
                .map(|cell| pad(&self.day_label(cell), width))
                .collect::<String>();
            let dots = row
                .iter()
                .map(|cell| pad(&self.dot_line(cell), width))
                .collect::<String>();
            writeln!(out, "{}", days.trim_end())?;
            writeln!(out, "{}", dots.trim_end())?;
        }

        Ok(())
    }

    pub fn write_period<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        stats: &PeriodStats,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} tasks: {} pending, {} in progress, {} completed",
            stats.total, stats.pending, stats.in_progress, stats.completed
        )?;
        if tasks.is_empty() {
            return Ok(());
        }

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(short_id(&task.id), "33"),
                    task.start_date.map(format_date).unwrap_or_default(),
                    task.due_date.map(format_date).unwrap_or_default(),
                    self.status_cell(task.status),
                    task.title.clone(),
                ]
            })
            .collect();
        write_table(out, headers(&["ID", "Start", "Due", "Status", "Title"]), rows)
    }

    #[tracing::instrument(skip_all, fields(date = %popup.date))]
    pub fn write_day_popup<W: Write>(&self, out: &mut W, popup: &DayPopup) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&popup.heading, "1"))?;

        if let Some(message) = popup.empty_message() {
            writeln!(out, "  {message}")?;
        }

        for event in &popup.events {
            writeln!(
                out,
                "  {} {} {}",
                self.paint(short_id(&event.task_id), "33"),
                self.status_cell(event.status),
                event.title
            )?;
            if let Some(project) = &event.project {
                writeln!(out, "      project  {}", self.project_cell(project))?;
            }
            if let Some(line) = &event.date_line {
                writeln!(out, "      {line}")?;
            }
            if let Some(description) = &event.description {
                writeln!(out, "      {description}")?;
            }
        }

        writeln!(
            out,
            "  ({}: trellis task new-on {} <title>)",
            popup.new_task.label(),
            format_date(popup.date)
        )?;
        Ok(())
    }

    pub fn write_task_detail<W: Write>(&self, out: &mut W, detail: &TaskDetail) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&detail.title, "1"))?;
        writeln!(out, "id          {}", detail.task_id)?;
        writeln!(out, "status      {}", self.status_cell(detail.status))?;
        writeln!(out, "priority    {}", detail.priority)?;
        if let Some(project) = &detail.project {
            writeln!(out, "project     {}", self.project_cell(project))?;
        }
        if let Some(line) = &detail.date_line {
            writeln!(out, "dates       {line}")?;
        }
        if let Some(description) = &detail.description {
            writeln!(out, "description {description}")?;
        }

        let actions = detail
            .actions
            .iter()
            .map(|action| action.label)
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(out, "actions     {actions}")?;
        Ok(())
    }

    pub fn write_dashboard<W: Write>(&self, out: &mut W, dash: &Dashboard) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}",
            self.paint(&format!("Dashboard for {}", format_date(dash.today)), "1")
        )?;
        writeln!(
            out,
            "tasks       {} ({} pending, {} in progress, {} completed)",
            dash.total, dash.status.pending, dash.status.in_progress, dash.status.completed
        )?;
        writeln!(
            out,
            "priority    {} high, {} medium, {} low",
            dash.priority.high, dash.priority.medium, dash.priority.low
        )?;

        let overdue = dash.overdue.to_string();
        let overdue = if dash.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(out, "overdue     {overdue}")?;
        writeln!(out, "due today   {}", dash.due_today)?;

        if !dash.upcoming.is_empty() {
            writeln!(out)?;
            let rows = dash
                .upcoming
                .iter()
                .map(|item| {
                    vec![
                        self.paint(short_id(&item.task_id), "33"),
                        format_date(item.due),
                        item.title.clone(),
                    ]
                })
                .collect();
            write_table(&mut *out, headers(&["ID", "Due", "Upcoming"]), rows)?;
        }

        if !dash.projects.is_empty() {
            writeln!(out)?;
            let rows = dash
                .projects
                .iter()
                .map(|progress| {
                    vec![
                        progress.name.clone(),
                        format!("{}/{}", progress.completed, progress.total),
                        format!("{}%", progress.percent()),
                    ]
                })
                .collect();
            write_table(&mut *out, headers(&["Project", "Done", "Progress"]), rows)?;
        }

        Ok(())
    }

    pub fn write_project_table<W: Write>(&self, out: &mut W, projects: &[Project]) -> anyhow::Result<()> {
        if projects.is_empty() {
            writeln!(out, "No projects.")?;
            return Ok(());
        }

        let rows = projects
            .iter()
            .map(|project| {
                vec![
                    self.paint(short_id(&project.id), "33"),
                    self.paint(&project.name, project.color.ansi_code()),
                    project.color.as_key().to_string(),
                    project.description.clone(),
                ]
            })
            .collect();
        write_table(out, headers(&["ID", "Name", "Color", "Description"]), rows)
    }

    pub fn write_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        projects: &[Project],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let rows = tasks
            .iter()
            .map(|task| {
                let due = task.due_date.map(format_date).unwrap_or_default();
                let due = if task.is_overdue(today) {
                    self.paint(&due, "31")
                } else {
                    due
                };
                let project = task
                    .project_id
                    .as_deref()
                    .and_then(|id| projects.iter().find(|project| project.id == id))
                    .map(|project| self.paint(&project.name, project.color.ansi_code()))
                    .unwrap_or_default();

                vec![
                    self.paint(short_id(&task.id), "33"),
                    self.status_cell(task.status),
                    task.priority.to_string(),
                    task.start_date.map(format_date).unwrap_or_default(),
                    due,
                    project,
                    task.title.clone(),
                ]
            })
            .collect();
        write_table(
            out,
            headers(&["ID", "Status", "Pri", "Start", "Due", "Project", "Title"]),
            rows,
        )
    }

    pub fn write_comment_table<W: Write>(&self, out: &mut W, comments: &[Comment]) -> anyhow::Result<()> {
        if comments.is_empty() {
            writeln!(out, "No comments.")?;
            return Ok(());
        }

        let rows = comments
            .iter()
            .map(|comment| {
                vec![
                    self.paint(short_id(&comment.id), "33"),
                    comment.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    comment.author.clone().unwrap_or_default(),
                    comment.body.clone(),
                ]
            })
            .collect();
        write_table(out, headers(&["ID", "Created", "Author", "Comment"]), rows)
    }

    fn day_label(&self, cell: &CalendarCell) -> String {
        let mut label = cell.date.format("%-d").to_string();
        if cell.is_today {
            label.push('*');
        }
        if cell.is_selected {
            label = format!("[{label}]");
        }

        if cell.is_today {
            self.paint(&label, "1;33")
        } else if cell.is_other_month() {
            self.paint(&label, "2")
        } else {
            label
        }
    }

    fn dot_line(&self, cell: &CalendarCell) -> String {
        let mut line = cell
            .markers
            .iter()
            .map(|marker| self.paint(MARKER, marker.color.ansi_code()))
            .collect::<String>();
        line.push_str(&OVERFLOW.repeat(cell.overflow_dots));
        line
    }

    fn status_cell(&self, status: Status) -> String {
        let code = match status {
            Status::Pending => "37",
            Status::InProgress => "34",
            Status::Completed => "32",
        };
        self.paint(status.label(), code)
    }

    fn project_cell(&self, project: &ProjectLabel) -> String {
        self.paint(&project.name, project.color.ansi_code())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn pad(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(strip_ansi(text).as_str());
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
