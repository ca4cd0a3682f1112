use std::io::Write;

use anyhow::anyhow;
use tracing::{info, instrument};

use super::{CommandContext, short_id};
use crate::cli::{CommentCommand, ProjectCommand, join_words};
use crate::task::{Comment, Project};

#[instrument(skip(ctx, command, out))]
pub(super) fn cmd_project<W: Write>(
    ctx: &CommandContext<'_>,
    command: ProjectCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        ProjectCommand::Add {
            name,
            color,
            description,
        } => {
            info!("command project add");
            let name = required_text(&join_words(&name), "project name")?;
            if ctx.store.resolve_project(&name).is_ok_and(|found| found.name.eq_ignore_ascii_case(&name)) {
                return Err(anyhow!("project already exists: {name}"));
            }

            let mut project = Project::new(&ctx.store.workspace_id, name, ctx.now);
            if let Some(color) = color {
                project.color = color;
            }
            project.description = description.unwrap_or_default().trim().to_string();

            let project = ctx.store.add_project(project)?;
            writeln!(out, "Created project '{}' ({}).", project.name, project.color)?;
            Ok(())
        }
        ProjectCommand::List => {
            let projects = ctx.store.list_projects()?;
            ctx.renderer.write_project_table(out, &projects)
        }
        ProjectCommand::Edit {
            id,
            name,
            color,
            description,
        } => {
            info!("command project edit");
            let name = name
                .map(|raw| required_text(&raw, "project name"))
                .transpose()?;
            let target = ctx.store.resolve_project(&id)?;
            let project = ctx.store.update_project(&target.id, ctx.now, |project| {
                if let Some(name) = name {
                    project.name = name;
                }
                if let Some(color) = color {
                    project.color = color;
                }
                if let Some(description) = description {
                    project.description = description.trim().to_string();
                }
            })?;
            writeln!(out, "Modified project '{}'.", project.name)?;
            Ok(())
        }
        ProjectCommand::Delete { id } => {
            info!("command project delete");
            let target = ctx.store.resolve_project(&id)?;
            let summary = ctx.store.delete_project(&target.id)?;
            writeln!(
                out,
                "Deleted project '{}' with {} tasks and {} comments.",
                target.name, summary.tasks, summary.comments
            )?;
            Ok(())
        }
    }
}

#[instrument(skip(ctx, command, out))]
pub(super) fn cmd_comment<W: Write>(
    ctx: &CommandContext<'_>,
    command: CommentCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        CommentCommand::Add { task, body, author } => {
            info!("command comment add");
            let body = required_text(&join_words(&body), "comment body")?;
            let mut comment = Comment::new(&task, body, ctx.now);
            comment.author = author
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty());
            let comment = ctx.store.add_comment(comment)?;
            writeln!(out, "Added comment {}.", short_id(&comment.id))?;
            Ok(())
        }
        CommentCommand::List { task } => {
            let comments = ctx.store.list_comments(&task)?;
            ctx.renderer.write_comment_table(out, &comments)
        }
        CommentCommand::Delete { id } => {
            ctx.store.delete_comment(&id)?;
            writeln!(out, "Deleted comment.")?;
            Ok(())
        }
    }
}

fn required_text(raw: &str, what: &str) -> anyhow::Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(anyhow!("{what} cannot be empty"));
    }
    Ok(text.to_string())
}
