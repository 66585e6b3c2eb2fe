//! Core engine. The public API for the work queue and session clock.
//!
//! The engine owns the storage. Every write is one transaction; the
//! composite operations here span tasks and sessions inside a single
//! transaction so a caller never sees half of one applied.

mod queue;
mod sessions;

use std::path::Path;

use opentelemetry::KeyValue;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::*;
use crate::storage::{self, Storage};
use crate::telemetry::metrics;
use crate::telemetry::spans::operation_span;

/// The work queue engine. Owns all state and enforces all invariants.
pub struct Engine {
    storage: Storage,
}

/// What `toggle_session` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggled {
    /// No session was open; this one was started.
    Started(WorkSession),
    /// The open session was closed.
    Paused(WorkSession),
}

/// Result of a composite rotate or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moved {
    /// The task after the change.
    pub task: Task,
    /// The session that was closed on the way, if one was open.
    pub paused: Option<WorkSession>,
}

impl Engine {
    /// Create an engine with in-memory storage (for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            storage: Storage::in_memory()?,
        })
    }

    /// Create an engine backed by a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    /// Close the task's open session (if any), then move the task to the
    /// back of the queue.
    ///
    /// Both steps share one transaction: if the rotate fails the session
    /// stays open.
    pub fn rotate_with_pause(&mut self, task_id: TaskId) -> Result<Moved> {
        let _span = operation_span("rotate_with_pause", Some(task_id)).entered();
        let now = storage::now();

        let moved = self.storage.with_transaction(|ctx| {
            let paused = sessions::pause_in(ctx, task_id, now)?;
            let task = queue::rotate_in(ctx, task_id)?;
            Ok(Moved { task, paused })
        })?;

        record_pause(moved.paused.as_ref());
        metrics::queue_rotations().add(1, &[]);
        info!(
            task_id = %task_id,
            queue_order = moved.task.queue_order,
            paused = moved.paused.is_some(),
            "task rotated"
        );

        Ok(moved)
    }

    /// Close the task's open session (if any), then soft-delete the task.
    ///
    /// Same atomicity as [`Engine::rotate_with_pause`].
    pub fn delete_with_pause(&mut self, task_id: TaskId) -> Result<Moved> {
        let _span = operation_span("delete_with_pause", Some(task_id)).entered();
        let now = storage::now();

        let moved = self.storage.with_transaction(|ctx| {
            let paused = sessions::pause_in(ctx, task_id, now)?;
            let task = queue::soft_delete_in(ctx, task_id)?;
            Ok(Moved { task, paused })
        })?;

        record_pause(moved.paused.as_ref());
        metrics::task_deletions().add(1, &[KeyValue::new("operation", "soft_delete")]);
        info!(task_id = %task_id, paused = moved.paused.is_some(), "task soft-deleted");

        Ok(moved)
    }
}

fn record_pause(paused: Option<&WorkSession>) {
    if let Some(session) = paused {
        metrics::session_transitions().add(1, &[KeyValue::new("to", "closed")]);
        info!(
            task_id = %session.task_id,
            session_id = %session.id,
            seconds = session.end_time.map_or(0, |end| session.elapsed_seconds(end)),
            "work session paused"
        );
    }
}

/// Trim a task name, rejecting names that are empty afterwards.
fn validated_name(raw: &str) -> Result<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "task name must not be empty".to_string(),
        ));
    }
    Ok(name)
}
