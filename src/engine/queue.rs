//! Queue operations: ordering, soft-delete, undo, purge.
//!
//! The queue is a rotating list keyed by `queue_order`. Rotation hands a
//! task a key larger than any key ever issued, which moves it to the
//! back without touching any other row.

use opentelemetry::KeyValue;
use tracing::{debug, info};

use super::{Engine, validated_name};
use crate::error::{Error, Result};
use crate::model::*;
use crate::storage::{self, TxContext};
use crate::telemetry::metrics;
use crate::telemetry::spans::operation_span;

/// Move a live task behind every other task, soft-deleted ones included.
pub(super) fn rotate_in(ctx: &TxContext<'_>, task_id: TaskId) -> Result<Task> {
    let queue_order = ctx.next_queue_order()?;
    if !ctx.set_queue_order(task_id, queue_order)? {
        return Err(Error::NotFound(task_id));
    }
    ctx.get_task(task_id)?.ok_or(Error::NotFound(task_id))
}

pub(super) fn soft_delete_in(ctx: &TxContext<'_>, task_id: TaskId) -> Result<Task> {
    if !ctx.mark_deleted(task_id)? {
        return Err(Error::NotFound(task_id));
    }
    ctx.get_task(task_id)?.ok_or(Error::NotFound(task_id))
}

impl Engine {
    /// Append a task to the back of the queue.
    pub fn add(&mut self, name: &str) -> Result<Task> {
        let _span = operation_span("add", None).entered();
        let name = validated_name(name)?;
        let now = storage::now();

        let task = self
            .storage
            .with_transaction(|ctx| ctx.insert_task(name, now))?;

        metrics::tasks_added().add(1, &[]);
        info!(task_id = %task.id, queue_order = task.queue_order, "task added");

        Ok(task)
    }

    /// The head of the queue: the live task with the smallest order key.
    pub fn current_task(&self) -> Result<Option<Task>> {
        self.storage.current_task()
    }

    /// Number of live tasks.
    pub fn queue_size(&self) -> Result<usize> {
        self.storage.queue_size()
    }

    /// All live tasks, head first.
    pub fn all_tasks(&self) -> Result<Vec<Task>> {
        self.storage.list_live_tasks()
    }

    /// Look up a task by id. Soft-deleted tasks are returned until purged.
    pub fn task(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.storage.get_task(task_id)
    }

    /// Move a live task to the back of the queue.
    ///
    /// Does not touch work sessions; see [`Engine::rotate_with_pause`].
    pub fn rotate(&mut self, task_id: TaskId) -> Result<Task> {
        let _span = operation_span("rotate", Some(task_id)).entered();

        let task = self
            .storage
            .with_transaction(|ctx| rotate_in(ctx, task_id))?;

        metrics::queue_rotations().add(1, &[]);
        info!(task_id = %task_id, queue_order = task.queue_order, "task rotated");

        Ok(task)
    }

    /// Hide a live task from the queue. Restorable by
    /// [`Engine::undo_delete`] until [`Engine::cleanup_deleted_tasks`] runs.
    pub fn soft_delete(&mut self, task_id: TaskId) -> Result<()> {
        let _span = operation_span("soft_delete", Some(task_id)).entered();

        self.storage
            .with_transaction(|ctx| soft_delete_in(ctx, task_id))?;

        metrics::task_deletions().add(1, &[KeyValue::new("operation", "soft_delete")]);
        info!(task_id = %task_id, "task soft-deleted");

        Ok(())
    }

    /// Whether there is anything for [`Engine::undo_delete`] to restore.
    pub fn has_deleted_task(&self) -> Result<bool> {
        self.storage.has_deleted_task()
    }

    /// Restore every soft-deleted task at once. Returns how many came back.
    ///
    /// Tasks keep their original order keys, so they reappear where they
    /// were relative to tasks that were never deleted.
    pub fn undo_delete(&mut self) -> Result<usize> {
        let _span = operation_span("undo_delete", None).entered();

        let restored = self.storage.with_transaction(|ctx| ctx.restore_deleted())?;

        if restored == 0 {
            debug!("undo requested with no deleted tasks");
        } else {
            metrics::task_deletions().add(
                restored as u64,
                &[KeyValue::new("operation", "restore")],
            );
            info!(restored, "deleted tasks restored");
        }

        Ok(restored)
    }

    /// Permanently remove every soft-deleted task. This closes the undo
    /// window. Session history of purged tasks is kept. Returns how many
    /// tasks were removed.
    ///
    /// Callers invoke this explicitly before their next destructive
    /// action; nothing runs it automatically.
    pub fn cleanup_deleted_tasks(&mut self) -> Result<usize> {
        let _span = operation_span("cleanup_deleted_tasks", None).entered();

        let purged = self.storage.with_transaction(|ctx| ctx.purge_deleted())?;

        if purged > 0 {
            metrics::task_deletions().add(purged as u64, &[KeyValue::new("operation", "purge")]);
            info!(purged, "deleted tasks purged");
        }

        Ok(purged)
    }

    /// Rename a task. Surrounding whitespace is trimmed; renaming to the
    /// current name changes nothing.
    pub fn rename(&mut self, task_id: TaskId, new_name: &str) -> Result<Task> {
        let _span = operation_span("rename", Some(task_id)).entered();
        let name = validated_name(new_name)?;

        let (task, changed) = self.storage.with_transaction(|ctx| {
            let task = ctx.get_task(task_id)?.ok_or(Error::NotFound(task_id))?;
            if task.name == name {
                return Ok((task, false));
            }
            ctx.rename_task(task_id, name)?;
            Ok((
                Task {
                    name: name.to_string(),
                    ..task
                },
                true,
            ))
        })?;

        if changed {
            info!(task_id = %task_id, "task renamed");
        } else {
            debug!(task_id = %task_id, "rename to identical name skipped");
        }

        Ok(task)
    }
}
