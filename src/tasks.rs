use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;
use tokio::sync::watch;

use crate::config;
use crate::convert;
use crate::periodic;
use crate::store::JsonStore;
use crate::task::{Task, TaskStats, TaskType, upsert};

// ============================================================================
// Repository
// ============================================================================

/// Outcome of a save or delete attempt. Rejections are caller mistakes caught
/// before anything is written; store failures surface as errors instead.
#[derive(Debug, PartialEq)]
pub enum SaveOutcome {
    Saved,
    Rejected(String),
}

/// Single owner of the task store. Every mutation goes through here so the
/// revision counter stays in step with what is on disk.
#[derive(Clone)]
pub struct TaskRepository {
    store: JsonStore,
    revision: watch::Sender<u64>,
}

impl TaskRepository {
    pub fn new(store: JsonStore) -> TaskRepository {
        let (revision, _) = watch::channel(0);
        TaskRepository { store, revision }
    }

    /// Load every task with its status freshly recomputed. Persisted
    /// statuses go stale overnight: a task due yesterday must read as late
    /// today whether or not anything was saved in between.
    pub async fn load_all(&self) -> Result<Vec<Task>> {
        let today = config::today();
        let mut tasks: Vec<Task> = self.store.load().await?;
        for task in &mut tasks {
            task.normalize(today);
        }
        Ok(tasks)
    }

    /// Persist the whole list and bump the revision.
    pub async fn save_all(&self, tasks: &[Task]) -> Result<()> {
        self.store.save(tasks).await?;
        self.revision.send_modify(|rev| *rev += 1);
        Ok(())
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Observe list changes, for anything that wants to react to saves.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// The save pipeline: validate, route periodic lifecycles through the
    /// case handler, route bare type changes through the converter, and
    /// plain-upsert everything else. The resulting list is persisted
    /// wholesale.
    pub async fn save_task(&self, task: Task) -> Result<SaveOutcome> {
        let today = config::today();
        let task = task.normalized(today);

        if let Err(message) = task.validate() {
            return Ok(SaveOutcome::Rejected(message));
        }
        if task.kind == TaskType::Periodic
            && (task.end_date.is_none() || task.frequency.is_none_or(|f| f < 1))
        {
            return Ok(SaveOutcome::Rejected(
                "Periodic tasks need an end date and a frequency of at least 1".to_string(),
            ));
        }

        let tasks = self.load_all().await?;
        let snapshot = tasks.iter().find(|t| t.id == task.id).cloned();

        let was_periodic = snapshot.as_ref().is_some_and(|s| s.kind == TaskType::Periodic);
        let result = if task.kind == TaskType::Periodic || was_periodic {
            periodic::handle_save(task, tasks, snapshot.as_ref(), today).into_tasks()
        } else if snapshot.as_ref().is_some_and(|s| s.kind != task.kind) {
            match convert::convert(&task, &tasks, today) {
                Some(converted) => converted,
                None => {
                    let mut tasks = tasks;
                    upsert(&mut tasks, task);
                    tasks
                }
            }
        } else {
            let mut tasks = tasks;
            upsert(&mut tasks, task);
            tasks
        };

        self.save_all(&result).await?;
        Ok(SaveOutcome::Saved)
    }

    /// Delete by id. A periodic member takes its whole family with it.
    pub async fn delete_task(&self, id: i64) -> Result<SaveOutcome> {
        let tasks = self.load_all().await?;
        let Some(target) = tasks.iter().find(|t| t.id == id).cloned() else {
            return Ok(SaveOutcome::Rejected(format!("Task {} not found", id)));
        };

        let remaining: Vec<Task> = if target.kind == TaskType::Periodic {
            periodic::delete_family(&target, tasks)
        } else {
            tasks.into_iter().filter(|t| t.id != id).collect()
        };

        self.save_all(&remaining).await?;
        Ok(SaveOutcome::Saved)
    }
}

// ============================================================================
// Shared Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskRepository,
    pub diary: JsonStore,
}

impl AppState {
    pub fn new(data_dir: &std::path::Path) -> AppState {
        AppState {
            tasks: TaskRepository::new(JsonStore::new(data_dir.join("tasks.json"))),
            diary: JsonStore::new(data_dir.join("diary-entries.json")),
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(replace_tasks))
        .route("/tasks/save", post(save_task))
        .route("/tasks/stats", get(task_stats))
        .route("/tasks/revision", get(revision))
        .route("/tasks/{id}", delete(delete_task))
}

/// Task lists must never be cached: statuses are recomputed per request.
const NO_STORE: &str = "no-store, no-cache, must-revalidate, private";

pub(crate) fn internal_error(message: &str, error: anyhow::Error) -> Response {
    eprintln!("Error: {}: {:#}", message, error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn list_tasks(State(state): State<AppState>) -> Response {
    match state.tasks.load_all().await {
        Ok(tasks) => {
            ([(header::CACHE_CONTROL, NO_STORE)], Json(tasks)).into_response()
        }
        Err(e) => internal_error("Failed to load tasks", e),
    }
}

/// Replace the stored list wholesale with whatever the client sends.
async fn replace_tasks(State(state): State<AppState>, Json(tasks): Json<Vec<Task>>) -> Response {
    match state.tasks.save_all(&tasks).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => internal_error("Failed to save tasks", e),
    }
}

async fn save_task(State(state): State<AppState>, Json(task): Json<Task>) -> Response {
    match state.tasks.save_task(task).await {
        Ok(SaveOutcome::Saved) => Json(json!({ "success": true })).into_response(),
        Ok(SaveOutcome::Rejected(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response(),
        Err(e) => internal_error("Failed to save task", e),
    }
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.tasks.delete_task(id).await {
        Ok(SaveOutcome::Saved) => Json(json!({ "success": true })).into_response(),
        Ok(SaveOutcome::Rejected(message)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response(),
        Err(e) => internal_error("Failed to delete task", e),
    }
}

async fn task_stats(State(state): State<AppState>) -> Response {
    match state.tasks.load_all().await {
        Ok(tasks) => Json(TaskStats::calculate(&tasks)).into_response(),
        Err(e) => internal_error("Failed to load task stats", e),
    }
}

async fn revision(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "revision": state.tasks.revision() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskStatus, day};
    use tempfile::tempdir;

    fn repository(dir: &tempfile::TempDir) -> TaskRepository {
        TaskRepository::new(JsonStore::new(dir.path().join("tasks.json")))
    }

    // Fixture dates live far in the future so real-clock status computation
    // stays deterministic.
    fn plain_task(id: i64, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            due: Some(day("2099-06-01")),
            ..Task::default()
        }
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        let outcome = repo.save_task(plain_task(1, "Buy milk")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);

        let tasks = repo.load_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].status, Some(TaskStatus::Due));
    }

    #[tokio::test]
    async fn test_save_upserts_by_id() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        repo.save_task(plain_task(1, "Buy milk")).await.unwrap();
        repo.save_task(plain_task(2, "Walk dog")).await.unwrap();
        repo.save_task(plain_task(1, "Buy oat milk")).await.unwrap();

        let tasks = repo.load_all().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.iter().find(|t| t.id == 1).unwrap().title, "Buy oat milk");
    }

    #[tokio::test]
    async fn test_untitled_task_is_rejected_without_writing() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);
        let before = repo.revision();

        let outcome = repo.save_task(plain_task(1, "   ")).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Rejected(_)));
        assert_eq!(repo.revision(), before);
    }

    #[tokio::test]
    async fn test_periodic_without_end_date_is_rejected() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        let task = Task {
            kind: TaskType::Periodic,
            frequency: Some(3),
            ..plain_task(1, "Stretch")
        };
        let outcome = repo.save_task(task).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_periodic_with_zero_frequency_is_rejected() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        let task = Task {
            kind: TaskType::Periodic,
            end_date: Some(day("2099-06-10")),
            frequency: Some(0),
            ..plain_task(1, "Stretch")
        };
        let outcome = repo.save_task(task).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_converting_to_periodic_through_pipeline() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        repo.save_task(plain_task(1, "Stretch")).await.unwrap();
        let edited = Task {
            kind: TaskType::Periodic,
            end_date: Some(day("2099-06-07")),
            frequency: Some(3),
            ..plain_task(1, "Stretch")
        };
        repo.save_task(edited).await.unwrap();

        let tasks = repo.load_all().await.unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.parent_id == Some(1)));
        assert_eq!(tasks.iter().filter(|t| t.is_mother()).count(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_whole_family() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        let mother = Task {
            kind: TaskType::Periodic,
            end_date: Some(day("2099-06-07")),
            frequency: Some(3),
            ..plain_task(1, "Stretch")
        };
        repo.save_task(mother).await.unwrap();
        repo.save_task(plain_task(2, "Unrelated")).await.unwrap();

        let outcome = repo.delete_task(1001).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);

        let tasks = repo.load_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 2);
    }

    #[tokio::test]
    async fn test_delete_missing_task_is_rejected() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);

        let outcome = repo.delete_task(404).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_revision_bumps_only_on_successful_save() {
        let dir = tempdir().unwrap();
        let repo = repository(&dir);
        assert_eq!(repo.revision(), 0);

        repo.save_task(plain_task(1, "Buy milk")).await.unwrap();
        assert_eq!(repo.revision(), 1);

        repo.save_task(plain_task(0, "")).await.unwrap();
        assert_eq!(repo.revision(), 1);

        let mut watcher = repo.subscribe();
        repo.save_task(plain_task(2, "Walk dog")).await.unwrap();
        assert!(watcher.has_changed().unwrap());
        assert_eq!(repo.revision(), 2);
    }
}
