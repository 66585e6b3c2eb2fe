//! Core data model.
//!
//! A task is an entry in the rotating work queue. A work session is one
//! timed interval of work on a task; sessions are history and outlive
//! the task they reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::{format_duration, format_duration_with_seconds};

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// An entry in the work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier. Never reused, even after a purge.
    pub id: TaskId,

    /// Display name. Never empty; always stored trimmed.
    pub name: String,

    /// Position key. The live task with the smallest key is the head of
    /// the queue. Keys are strictly increasing across every task ever
    /// created, so no two tasks share one.
    pub queue_order: i64,

    pub created_at: DateTime<Utc>,

    /// Live or soft-deleted.
    pub state: TaskState,
}

impl Task {
    pub fn is_deleted(&self) -> bool {
        self.state == TaskState::Deleted
    }
}

/// Newtype for task IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Whether a task takes part in the queue.
///
/// `Deleted` tasks are invisible to every ordering and size query but
/// remain addressable by id until the next purge. Undo flips every
/// `Deleted` task back to `Active` at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Active,
    Deleted,
}

impl TaskState {
    pub(crate) fn from_flag(is_deleted: bool) -> Self {
        if is_deleted {
            TaskState::Deleted
        } else {
            TaskState::Active
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Active => "active",
            TaskState::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Work Session
// ---------------------------------------------------------------------------

/// One timed interval of work on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: SessionId,

    /// The task worked on. May refer to a purged task.
    pub task_id: TaskId,

    pub start_time: DateTime<Utc>,

    /// `None` while the session is open. Set exactly once.
    pub end_time: Option<DateTime<Utc>>,
}

impl WorkSession {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whole seconds between start and end, or between start and `now`
    /// for an open session. Never negative.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_seconds().max(0)
    }
}

/// Newtype for work session IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time summary
// ---------------------------------------------------------------------------

/// Time accounting for one task, read as a single snapshot.
///
/// `daily_seconds` and `total_seconds` only count closed sessions. The
/// open session, if any, is reported separately in `active_seconds` so
/// callers can render a live clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub task_id: TaskId,
    pub active_seconds: Option<i64>,
    pub daily_seconds: i64,
    pub total_seconds: i64,
}

impl TimeSummary {
    pub fn is_running(&self) -> bool {
        self.active_seconds.is_some()
    }

    /// Today's total including the open session.
    pub fn live_daily(&self) -> i64 {
        self.daily_seconds + self.active_seconds.unwrap_or(0)
    }

    /// All-time total including the open session.
    pub fn live_total(&self) -> i64 {
        self.total_seconds + self.active_seconds.unwrap_or(0)
    }
}

impl std::fmt::Display for TimeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Time: {} (Today: {}, Total: {})",
            format_duration_with_seconds(self.active_seconds.unwrap_or(0)),
            format_duration(self.live_daily()),
            format_duration(self.live_total()),
        )
    }
}
