//! Built-in tools operating on the task store

mod create_task;
mod fetch_tasks;
mod no_op;
mod reorder;
mod update_status;

pub use create_task::CreateTaskTool;
pub use fetch_tasks::FetchTasksTool;
pub use no_op::NoOpTool;
pub use reorder::ReorderTasksTool;
pub use update_status::UpdateTaskStatusTool;
