use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::task::{Comment, Project, Status, Task};

const MIN_ID_PREFIX: usize = 4;

/// Read side of the persistence layer, scoped to one workspace.
pub trait TaskSource {
    fn tasks(&self) -> anyhow::Result<Vec<Task>>;
    fn projects(&self) -> anyhow::Result<Vec<Project>>;
}

/// Fetches both collections, degrading to empty ones when the source fails.
pub fn load_or_empty<S: TaskSource + ?Sized>(source: &S) -> (Vec<Task>, Vec<Project>) {
    let tasks = source.tasks().unwrap_or_else(|err| {
        error!(error = %format!("{err:#}"), "failed to load tasks; showing none");
        Vec::new()
    });
    let projects = source.projects().unwrap_or_else(|err| {
        error!(error = %format!("{err:#}"), "failed to load projects; showing none");
        Vec::new()
    });
    (tasks, projects)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub tasks: usize,
    pub comments: usize,
}

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub workspace_id: String,
    pub projects_path: PathBuf,
    pub tasks_path: PathBuf,
    pub comments_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path, workspace_id: &str) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let projects_path = data_dir.join("projects.data");
        let tasks_path = data_dir.join("tasks.data");
        let comments_path = data_dir.join("comments.data");

        for path in [&projects_path, &tasks_path, &comments_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            workspace = workspace_id,
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            workspace_id: workspace_id.to_string(),
            projects_path,
            tasks_path,
            comments_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn list_projects(&self) -> anyhow::Result<Vec<Project>> {
        Ok(self
            .load_all_projects()?
            .into_iter()
            .filter(|project| project.workspace_id == self.workspace_id)
            .collect())
    }

    /// Finds a project by exact name (case-insensitive) or by id prefix.
    pub fn resolve_project(&self, raw: &str) -> anyhow::Result<Project> {
        let projects = self.list_projects()?;
        let wanted = raw.trim();
        if let Some(project) = projects
            .iter()
            .find(|project| project.name.eq_ignore_ascii_case(wanted))
        {
            return Ok(project.clone());
        }

        let full_id = resolve_id(
            projects.iter().map(|project| project.id.as_str()),
            wanted,
            "project",
        )?;
        projects
            .into_iter()
            .find(|project| project.id == full_id)
            .ok_or_else(|| anyhow!("project not found: {raw}"))
    }

    #[tracing::instrument(skip(self, project), fields(id = %project.id))]
    pub fn add_project(&self, mut project: Project) -> anyhow::Result<Project> {
        project.workspace_id = self.workspace_id.clone();
        let mut all = self.load_all_projects()?;
        all.push(project.clone());
        self.save_projects(&all)?;
        info!(name = %project.name, "added project");
        Ok(project)
    }

    #[tracing::instrument(skip(self, edit))]
    pub fn update_project<F>(&self, id: &str, now: DateTime<Utc>, edit: F) -> anyhow::Result<Project>
    where
        F: FnOnce(&mut Project),
    {
        let mut all = self.load_all_projects()?;
        let full_id = self.resolve_project_id(&all, id)?;
        let project = all
            .iter_mut()
            .find(|project| project.id == full_id)
            .ok_or_else(|| anyhow!("project not found: {id}"))?;
        edit(project);
        project.updated_at = now;
        let updated = project.clone();
        self.save_projects(&all)?;
        Ok(updated)
    }

    /// Removes the project along with its tasks and their comments.
    #[tracing::instrument(skip(self))]
    pub fn delete_project(&self, id: &str) -> anyhow::Result<CascadeSummary> {
        let mut projects = self.load_all_projects()?;
        let full_id = self.resolve_project_id(&projects, id)?;
        projects.retain(|project| project.id != full_id);

        let mut tasks = self.load_all_tasks()?;
        let doomed: Vec<String> = tasks
            .iter()
            .filter(|task| task.project_id.as_deref() == Some(full_id.as_str()))
            .map(|task| task.id.clone())
            .collect();
        tasks.retain(|task| !doomed.contains(&task.id));

        let mut comments = self.load_all_comments()?;
        let before = comments.len();
        comments.retain(|comment| !doomed.contains(&comment.task_id));

        let summary = CascadeSummary {
            tasks: doomed.len(),
            comments: before - comments.len(),
        };

        self.save_comments(&comments)?;
        self.save_tasks(&tasks)?;
        self.save_projects(&projects)?;
        info!(
            project = %full_id,
            tasks = summary.tasks,
            comments = summary.comments,
            "deleted project"
        );
        Ok(summary)
    }

    #[tracing::instrument(skip(self))]
    pub fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        Ok(self
            .load_all_tasks()?
            .into_iter()
            .filter(|task| task.workspace_id == self.workspace_id)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub fn get_task(&self, id: &str) -> anyhow::Result<Task> {
        let tasks = self.list_tasks()?;
        let full_id = resolve_id(tasks.iter().map(|task| task.id.as_str()), id, "task")?;
        tasks
            .into_iter()
            .find(|task| task.id == full_id)
            .ok_or_else(|| anyhow!("task not found: {id}"))
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn add_task(&self, mut task: Task) -> anyhow::Result<Task> {
        task.workspace_id = self.workspace_id.clone();
        if let Some(project_id) = task.project_id.as_deref() {
            task.project_id = Some(self.resolve_project(project_id)?.id);
        }
        let mut all = self.load_all_tasks()?;
        all.push(task.clone());
        self.save_tasks(&all)?;
        info!(title = %task.title, "added task");
        Ok(task)
    }

    /// Applies `edit` to the stored task; the last writer wins.
    #[tracing::instrument(skip(self, edit))]
    pub fn update_task<F>(&self, id: &str, now: DateTime<Utc>, edit: F) -> anyhow::Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut all = self.load_all_tasks()?;
        let full_id = self.resolve_task_id(&all, id)?;
        let task = all
            .iter_mut()
            .find(|task| task.id == full_id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        edit(task);
        task.updated_at = now;
        let updated = task.clone();
        self.save_tasks(&all)?;
        Ok(updated)
    }

    pub fn set_task_status(&self, id: &str, status: Status, now: DateTime<Utc>) -> anyhow::Result<Task> {
        debug!(id, %status, "changing task status");
        self.update_task(id, now, |task| task.status = status)
    }

    /// Removes the task and its comments; returns how many comments went with it.
    #[tracing::instrument(skip(self))]
    pub fn delete_task(&self, id: &str) -> anyhow::Result<usize> {
        let mut tasks = self.load_all_tasks()?;
        let full_id = self.resolve_task_id(&tasks, id)?;
        tasks.retain(|task| task.id != full_id);

        let mut comments = self.load_all_comments()?;
        let before = comments.len();
        comments.retain(|comment| comment.task_id != full_id);
        let removed = before - comments.len();

        self.save_comments(&comments)?;
        self.save_tasks(&tasks)?;
        info!(task = %full_id, comments = removed, "deleted task");
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub fn list_comments(&self, task_id: &str) -> anyhow::Result<Vec<Comment>> {
        let task = self.get_task(task_id)?;
        let mut comments: Vec<Comment> = self
            .load_all_comments()?
            .into_iter()
            .filter(|comment| comment.task_id == task.id)
            .collect();
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    #[tracing::instrument(skip(self, comment), fields(task = %comment.task_id))]
    pub fn add_comment(&self, mut comment: Comment) -> anyhow::Result<Comment> {
        comment.task_id = self.get_task(&comment.task_id)?.id;
        let mut all = self.load_all_comments()?;
        all.push(comment.clone());
        self.save_comments(&all)?;
        Ok(comment)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_comment(&self, id: &str) -> anyhow::Result<()> {
        let task_ids: Vec<String> = self.list_tasks()?.into_iter().map(|task| task.id).collect();
        let mut all = self.load_all_comments()?;
        let full_id = resolve_id(
            all.iter()
                .filter(|comment| task_ids.contains(&comment.task_id))
                .map(|comment| comment.id.as_str()),
            id,
            "comment",
        )?;
        all.retain(|comment| comment.id != full_id);
        self.save_comments(&all)
    }

    fn resolve_project_id(&self, all: &[Project], id: &str) -> anyhow::Result<String> {
        resolve_id(
            all.iter()
                .filter(|project| project.workspace_id == self.workspace_id)
                .map(|project| project.id.as_str()),
            id,
            "project",
        )
    }

    fn resolve_task_id(&self, all: &[Task], id: &str) -> anyhow::Result<String> {
        resolve_id(
            all.iter()
                .filter(|task| task.workspace_id == self.workspace_id)
                .map(|task| task.id.as_str()),
            id,
            "task",
        )
    }

    fn load_all_projects(&self) -> anyhow::Result<Vec<Project>> {
        load_jsonl(&self.projects_path).context("failed to load projects.data")
    }

    fn load_all_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    fn load_all_comments(&self) -> anyhow::Result<Vec<Comment>> {
        load_jsonl(&self.comments_path).context("failed to load comments.data")
    }

    fn save_projects(&self, projects: &[Project]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.projects_path, projects).context("failed to save projects.data")
    }

    fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    fn save_comments(&self, comments: &[Comment]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.comments_path, comments).context("failed to save comments.data")
    }
}

impl TaskSource for DataStore {
    fn tasks(&self) -> anyhow::Result<Vec<Task>> {
        self.list_tasks()
    }

    fn projects(&self) -> anyhow::Result<Vec<Project>> {
        self.list_projects()
    }
}

/// Accepts a full id or an unambiguous prefix of at least four characters.
fn resolve_id<'a, I>(ids: I, needle: &str, kind: &str) -> anyhow::Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = needle.trim();
    let mut matches = Vec::new();
    for id in ids {
        if id == needle {
            return Ok(id.to_string());
        }
        if needle.len() >= MIN_ID_PREFIX && id.starts_with(needle) {
            matches.push(id);
        }
    }

    match matches.as_slice() {
        [only] => Ok((*only).to_string()),
        [] => Err(anyhow!("{kind} not found: {needle}")),
        _ => Err(anyhow!(
            "{kind} id prefix {needle} is ambiguous ({} matches)",
            matches.len()
        )),
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use tempfile::tempdir;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn deleting_a_project_cascades_to_tasks_and_comments() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path(), "ws").expect("open datastore");

        let project = store
            .add_project(Project::new("ws", "Launch".to_string(), now()))
            .expect("add project");
        let mut inside = Task::new_pending("ws", "Inside".to_string(), now());
        inside.project_id = Some(project.id.clone());
        let inside = store.add_task(inside).expect("add task");
        let outside = store
            .add_task(Task::new_pending("ws", "Outside".to_string(), now()))
            .expect("add task");

        store
            .add_comment(Comment::new(&inside.id, "first".to_string(), now()))
            .expect("add comment");
        store
            .add_comment(Comment::new(&outside.id, "kept".to_string(), now()))
            .expect("add comment");

        let summary = store.delete_project(&project.id).expect("delete project");
        assert_eq!(summary, CascadeSummary { tasks: 1, comments: 1 });

        let remaining = store.list_tasks().expect("list tasks");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, outside.id);
        assert_eq!(store.list_comments(&outside.id).expect("list comments").len(), 1);
        assert!(store.list_projects().expect("list projects").is_empty());
    }

    #[test]
    fn deleting_a_task_removes_its_comments() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path(), "ws").expect("open datastore");
        let task = store
            .add_task(Task::new_pending("ws", "Doomed".to_string(), now()))
            .expect("add task");
        for body in ["a", "b"] {
            store
                .add_comment(Comment::new(&task.id, body.to_string(), now()))
                .expect("add comment");
        }

        assert_eq!(store.delete_task(&task.id).expect("delete task"), 2);
        assert!(store.get_task(&task.id).is_err());
    }

    #[test]
    fn workspaces_are_isolated() {
        let temp = tempdir().expect("tempdir");
        let alpha = DataStore::open(temp.path(), "alpha").expect("open alpha");
        let beta = DataStore::open(temp.path(), "beta").expect("open beta");

        alpha
            .add_task(Task::new_pending("ignored", "Alpha task".to_string(), now()))
            .expect("add task");
        beta.add_task(Task::new_pending("beta", "Beta task".to_string(), now()))
            .expect("add task");

        let alpha_tasks = alpha.tasks().expect("alpha tasks");
        assert_eq!(alpha_tasks.len(), 1);
        assert_eq!(alpha_tasks[0].workspace_id, "alpha");
        assert_eq!(beta.list_tasks().expect("beta tasks").len(), 1);
    }

    #[test]
    fn updates_and_prefix_lookup() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path(), "ws").expect("open datastore");
        let task = store
            .add_task(Task::new_pending("ws", "Draft".to_string(), now()))
            .expect("add task");

        let prefix = &task.id[..8];
        let later = now() + chrono::Duration::hours(1);
        let updated = store
            .update_task(prefix, later, |task| {
                task.due_date = NaiveDate::from_ymd_opt(2024, 3, 20);
            })
            .expect("update task");
        assert_eq!(updated.updated_at, later);

        let done = store
            .set_task_status(&task.id, Status::Completed, later)
            .expect("complete task");
        assert!(done.is_completed());
        assert_eq!(store.get_task(prefix).expect("get task").due_date, updated.due_date);

        assert!(store.get_task("abc").is_err());
    }

    #[test]
    fn projects_resolve_by_name_or_prefix() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path(), "ws").expect("open datastore");
        let project = store
            .add_project(Project::new("ws", "Website".to_string(), now()))
            .expect("add project");

        assert_eq!(store.resolve_project("website").expect("by name").id, project.id);
        assert_eq!(
            store.resolve_project(&project.id[..6]).expect("by prefix").id,
            project.id
        );
        assert!(store.resolve_project("Mobile").is_err());

        let mut task = Task::new_pending("ws", "Landing page".to_string(), now());
        task.project_id = Some("Website".to_string());
        let task = store.add_task(task).expect("add task");
        assert_eq!(task.project_id.as_deref(), Some(project.id.as_str()));
    }

    struct Broken;

    impl TaskSource for Broken {
        fn tasks(&self) -> anyhow::Result<Vec<Task>> {
            Err(anyhow!("backend offline"))
        }

        fn projects(&self) -> anyhow::Result<Vec<Project>> {
            Err(anyhow!("backend offline"))
        }
    }

    #[test]
    fn failing_source_degrades_to_empty() {
        let (tasks, projects) = load_or_empty(&Broken);
        assert!(tasks.is_empty());
        assert!(projects.is_empty());
    }
}
