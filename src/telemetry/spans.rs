//! Span helpers for engine operations.

use tracing::Span;

use crate::model::TaskId;

/// Start a span for one engine operation.
///
/// `task.id` is left empty for operations that act on the whole queue
/// (add, undo, cleanup).
pub fn operation_span(operation: &'static str, task_id: Option<TaskId>) -> Span {
    let span = tracing::info_span!(
        "taskq.operation",
        "taskq.operation" = operation,
        "task.id" = tracing::field::Empty,
    );
    if let Some(id) = task_id {
        span.record("task.id", id.0);
    }
    span
}
