//! taskboard - SQLite-backed personal task store
//!
//! Stores tasks with a manual ordering position, status lifecycle
//! (open -> in_progress -> done), and free-form project/category tags.
//! The agent core mutates this store exclusively through its registered
//! tool handlers; the `tb` binary offers direct CRUD from the shell.

mod error;
mod store;
mod task;

pub use error::StoreError;
pub use store::TaskStore;
pub use task::{Task, TaskStatus};
