use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::builder::ValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;

use crate::calendar::ViewMode;
use crate::task::{Priority, ProjectColor, Status};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "trellis",
    version,
    about = "Trellis: task tracker with a month and week calendar",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "trellisrc")]
    pub trellisrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Defaults to `calendar` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Month or week grid with the visible period's tasks
    Calendar(CalendarArgs),
    /// Tasks falling on one day
    Day { date: String },
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Comment(CommentCommand),
    /// Workspace summary
    Dashboard,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CalendarArgs {
    #[arg(long, value_parser = ValueParser::new(|s: &str| s.parse::<ViewMode>()))]
    pub view: Option<ViewMode>,

    /// Anchor date; defaults to today
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub select: Option<String>,

    /// Step back this many periods
    #[arg(long, default_value_t = 0)]
    pub prev: u32,

    /// Step forward this many periods
    #[arg(long, default_value_t = 0)]
    pub next: u32,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long, value_parser = ValueParser::new(|s: &str| s.parse::<Priority>()))]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub due: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Create a task starting on the given date
    NewOn {
        date: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        clear_project: bool,
        #[arg(long)]
        clear_description: bool,
    },
    Status {
        id: String,
        #[arg(value_parser = ValueParser::new(|s: &str| s.parse::<Status>()))]
        status: Status,
    },
    Done {
        id: String,
    },
    Delete {
        id: String,
    },
    List {
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_parser = ValueParser::new(|s: &str| s.parse::<Status>()))]
        status: Option<Status>,
    },
    Show {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommand {
    Add {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
        #[arg(long, value_parser = ValueParser::new(|s: &str| s.parse::<ProjectColor>()))]
        color: Option<ProjectColor>,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = ValueParser::new(|s: &str| s.parse::<ProjectColor>()))]
        color: Option<ProjectColor>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project with its tasks and their comments
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CommentCommand {
    Add {
        task: String,
        #[arg(required = true, num_args = 1..)]
        body: Vec<String>,
        #[arg(long)]
        author: Option<String>,
    },
    List {
        task: String,
    },
    Delete {
        id: String,
    },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                if k.is_empty() {
                    return Err(anyhow!("empty key in rc override: {s}"));
                }
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k.to_string(), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

pub fn join_words(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&os(&[
            "trellis",
            "rc.color=off",
            "calendar",
            "rc.workspace:team",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, os(&["trellis", "calendar"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("color".to_string(), "off".to_string()),
                ("workspace".to_string(), "team".to_string()),
            ]
        );
        assert!(preprocess_args(&os(&["trellis", "rc.=x"])).is_err());
    }

    #[test]
    fn parses_calendar_and_task_commands() {
        let cli = GlobalCli::try_parse_from([
            "trellis", "-vv", "calendar", "--view", "week", "--next", "2",
        ])
        .expect("parse calendar");
        assert_eq!(cli.verbose, 2);
        let Some(Command::Calendar(args)) = cli.command else {
            panic!("expected calendar command");
        };
        assert_eq!(args.view, Some(ViewMode::Week));
        assert_eq!(args.next, 2);
        assert_eq!(args.prev, 0);

        let cli = GlobalCli::try_parse_from([
            "trellis", "task", "add", "Write", "report", "--due", "2024-03-20", "--priority", "high",
        ])
        .expect("parse task add");
        let Some(Command::Task(TaskCommand::Add { title, fields })) = cli.command else {
            panic!("expected task add");
        };
        assert_eq!(join_words(&title), "Write report");
        assert_eq!(fields.due.as_deref(), Some("2024-03-20"));
        assert_eq!(fields.priority, Some(Priority::High));
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(GlobalCli::try_parse_from(["trellis", "task", "status", "abcd", "blocked"]).is_err());
        let cli = GlobalCli::try_parse_from(["trellis", "--rc", "color=off"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.rc_overrides[0].key, "color");
    }
}
