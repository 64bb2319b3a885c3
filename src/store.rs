use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// A whole-collection JSON store: one pretty-printed array per file, read and
/// written in full. There is no partial write and no locking; the single
/// active editor reloads the list on every operation and writes it back.
#[derive(Clone, Debug)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonStore {
        JsonStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. A missing file is created as an empty array first,
    /// so a fresh data directory works without seeding.
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tokio::fs::write(&self.path, "[]")
                .await
                .with_context(|| format!("failed to create {}", self.path.display()))?;
        }

        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let records = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(records)
    }

    /// Replace the entire persisted collection.
    pub async fn save<T: Serialize>(&self, records: &[T]) -> Result<()> {
        let data = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.path, data)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskType, day};

    #[tokio::test]
    async fn test_missing_file_loads_as_empty_and_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("tasks.json"));

        let tasks: Vec<Task> = store.load().await.unwrap();
        assert!(tasks.is_empty());
        assert!(store.path().exists());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("tasks.json"));

        let tasks = vec![
            Task {
                id: 1,
                title: "Mow lawn".to_string(),
                due: Some(day("2025-05-01")),
                ..Task::default()
            },
            Task {
                id: 2,
                title: "Call plumber".to_string(),
                kind: TaskType::Reminder,
                ..Task::default()
            },
        ];
        store.save(&tasks).await.unwrap();

        let loaded: Vec<Task> = store.load().await.unwrap();
        let ids: Vec<i64> = loaded.iter().map(|t| t.id).collect();
        let kinds: Vec<TaskType> = loaded.iter().map(|t| t.kind).collect();
        let dues: Vec<_> = loaded.iter().map(|t| t.due).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(kinds, vec![TaskType::Regular, TaskType::Reminder]);
        assert_eq!(dues, vec![Some(day("2025-05-01")), None]);
    }

    #[tokio::test]
    async fn test_old_shape_file_loads_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id": "1712000000000", "title": "legacy", "type": "todo", "due": ""}]"#,
        )
        .unwrap();

        let store = JsonStore::new(&path);
        let tasks: Vec<Task> = store.load().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 1_712_000_000_000);
        assert_eq!(tasks[0].kind, TaskType::Regular);
        assert_eq!(tasks[0].due, None);
    }
}
