//! TaskStore - SQLite persistence for tasks
//!
//! A single `tasks` table with a manual `position` column for drag-style
//! ordering. All access goes through one connection behind a mutex, so the
//! store is `Send + Sync` and safe to share behind an `Arc`.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::error::StoreError;
use crate::task::{Task, TaskStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    project TEXT,
    categories TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'open',
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
";

/// SQLite-backed task store
pub struct TaskStore {
    conn: Mutex<Connection>,
}

impl TaskStore {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        debug!(path = %path.as_ref().display(), "TaskStore::open: called");
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store (for tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("TaskStore::open_in_memory: called");
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create a new task, appended to the end of the manual ordering
    pub fn create(
        &self,
        title: &str,
        description: &str,
        project: Option<&str>,
        categories: &[String],
    ) -> Result<Task, StoreError> {
        debug!(%title, "TaskStore::create: called");
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }

        let conn = self.lock()?;
        let next_position: i64 =
            conn.query_row("SELECT COALESCE(MAX(position), -1) + 1 FROM tasks", [], |row| row.get(0))?;

        let now = Utc::now();
        conn.execute(
            "INSERT INTO tasks (title, description, project, categories, status, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                title,
                description,
                project,
                serde_json::to_string(categories)?,
                TaskStatus::Open.as_str(),
                next_position,
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, "TaskStore::create: inserted");
        Self::fetch_one(&conn, id)
    }

    /// Get a task by id
    pub fn get(&self, id: i64) -> Result<Task, StoreError> {
        debug!(id, "TaskStore::get: called");
        let conn = self.lock()?;
        Self::fetch_one(&conn, id)
    }

    /// List tasks in manual order, optionally filtered by status
    pub fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, StoreError> {
        debug!(?status, "TaskStore::list: called");
        let conn = self.lock()?;

        let mut tasks = Vec::new();
        match status {
            Some(status) => {
                let mut stmt =
                    conn.prepare("SELECT * FROM tasks WHERE status = ?1 ORDER BY position, id")?;
                let rows = stmt.query_map(params![status.as_str()], Self::task_from_row)?;
                for row in rows {
                    tasks.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY position, id")?;
                let rows = stmt.query_map([], Self::task_from_row)?;
                for row in rows {
                    tasks.push(row?);
                }
            }
        }

        debug!(count = tasks.len(), "TaskStore::list: returning");
        Ok(tasks)
    }

    /// Update a task's status with timestamp bookkeeping
    pub fn update_status(&self, id: i64, status: TaskStatus) -> Result<Task, StoreError> {
        debug!(id, %status, "TaskStore::update_status: called");
        let conn = self.lock()?;

        let mut task = Self::fetch_one(&conn, id)?;
        task.set_status(status);

        conn.execute(
            "UPDATE tasks SET status = ?1, started_at = ?2, completed_at = ?3 WHERE id = ?4",
            params![
                task.status.as_str(),
                task.started_at.map(|t| t.to_rfc3339()),
                task.completed_at.map(|t| t.to_rfc3339()),
                id,
            ],
        )?;

        Ok(task)
    }

    /// Reorder tasks by assigning positions from the given id sequence
    ///
    /// Ids not present in the sequence keep their relative order after the
    /// reordered ones. Every id in the sequence must exist.
    pub fn reorder(&self, ids: &[i64]) -> Result<(), StoreError> {
        debug!(?ids, "TaskStore::reorder: called");
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for id in ids {
            let exists: i64 =
                tx.query_row("SELECT COUNT(*) FROM tasks WHERE id = ?1", params![id], |row| row.get(0))?;
            if exists == 0 {
                return Err(StoreError::InvalidReorder {
                    detail: format!("unknown task id {}", id),
                });
            }
        }

        for (position, id) in ids.iter().enumerate() {
            tx.execute(
                "UPDATE tasks SET position = ?1 WHERE id = ?2",
                params![position as i64, id],
            )?;
        }

        // Push unmentioned tasks after the reordered block, preserving order
        let unmentioned: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM tasks ORDER BY position, id")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            let mut remaining = Vec::new();
            for row in rows {
                let id = row?;
                if !ids.contains(&id) {
                    remaining.push(id);
                }
            }
            remaining
        };
        for (offset, id) in unmentioned.iter().enumerate() {
            tx.execute(
                "UPDATE tasks SET position = ?1 WHERE id = ?2",
                params![(ids.len() + offset) as i64, id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete a task by id
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        debug!(id, "TaskStore::delete: called");
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn fetch_one(conn: &Connection, id: i64) -> Result<Task, StoreError> {
        conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id], Self::task_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound { id },
                other => StoreError::Sqlite(other),
            })
    }

    fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
        let categories_json: String = row.get("categories")?;
        let status_str: String = row.get("status")?;
        Ok(Task {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            project: row.get("project")?,
            categories: serde_json::from_str(&categories_json).unwrap_or_default(),
            status: TaskStatus::parse(&status_str).unwrap_or_default(),
            position: row.get("position")?,
            created_at: parse_ts(row.get::<_, String>("created_at")?),
            started_at: row.get::<_, Option<String>>("started_at")?.map(parse_ts),
            completed_at: row.get::<_, Option<String>>("completed_at")?.map(parse_ts),
        })
    }
}

fn parse_ts(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TaskStore {
        TaskStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let task = store.create("Buy milk", "2%", None, &[]).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Open);

        let fetched = store.get(task.id).unwrap();
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(fetched.description, "2%");
    }

    #[test]
    fn test_create_empty_title_rejected() {
        let store = store();
        let err = store.create("   ", "", None, &[]).unwrap_err();
        assert!(matches!(err, StoreError::EmptyTitle));
    }

    #[test]
    fn test_create_assigns_increasing_positions() {
        let store = store();
        let a = store.create("A", "", None, &[]).unwrap();
        let b = store.create("B", "", None, &[]).unwrap();
        assert!(b.position > a.position);
    }

    #[test]
    fn test_categories_roundtrip() {
        let store = store();
        let cats = vec!["home".to_string(), "errand".to_string()];
        let task = store.create("Buy milk", "", Some("chores"), &cats).unwrap();
        let fetched = store.get(task.id).unwrap();
        assert_eq!(fetched.categories, cats);
        assert_eq!(fetched.project.as_deref(), Some("chores"));
    }

    #[test]
    fn test_list_with_status_filter() {
        let store = store();
        let a = store.create("A", "", None, &[]).unwrap();
        store.create("B", "", None, &[]).unwrap();
        store.update_status(a.id, TaskStatus::Done).unwrap();

        let open = store.list(Some(TaskStatus::Open)).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "B");

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_update_status_stamps_timestamps() {
        let store = store();
        let task = store.create("A", "", None, &[]).unwrap();

        let started = store.update_status(task.id, TaskStatus::InProgress).unwrap();
        assert!(started.started_at.is_some());
        assert!(started.completed_at.is_none());

        let done = store.update_status(task.id, TaskStatus::Done).unwrap();
        assert!(done.completed_at.is_some());

        let reopened = store.update_status(task.id, TaskStatus::Open).unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn test_update_status_not_found() {
        let store = store();
        let err = store.update_status(999, TaskStatus::Done).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 999 }));
    }

    #[test]
    fn test_reorder() {
        let store = store();
        let a = store.create("A", "", None, &[]).unwrap();
        let b = store.create("B", "", None, &[]).unwrap();
        let c = store.create("C", "", None, &[]).unwrap();

        store.reorder(&[c.id, a.id, b.id]).unwrap();

        let titles: Vec<String> = store.list(None).unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_reorder_partial_keeps_rest_after() {
        let store = store();
        let a = store.create("A", "", None, &[]).unwrap();
        store.create("B", "", None, &[]).unwrap();
        let c = store.create("C", "", None, &[]).unwrap();

        store.reorder(&[c.id, a.id]).unwrap();

        let titles: Vec<String> = store.list(None).unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_reorder_unknown_id() {
        let store = store();
        store.create("A", "", None, &[]).unwrap();
        let err = store.reorder(&[999]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReorder { .. }));
    }

    #[test]
    fn test_delete() {
        let store = store();
        let task = store.create("A", "", None, &[]).unwrap();
        store.delete(task.id).unwrap();
        assert!(matches!(store.get(task.id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_open_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tasks.db");
        {
            let store = TaskStore::open(&path).unwrap();
            store.create("Persisted", "", None, &[]).unwrap();
        }
        let store = TaskStore::open(&path).unwrap();
        assert_eq!(store.list(None).unwrap().len(), 1);
    }
}
