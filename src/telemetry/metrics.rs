//! Metric instrument factories for taskq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint no provider is installed and every
//! instrument is a no-op.

use opentelemetry::metrics::{Counter, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("taskq")
}

/// Counter: tasks appended to the queue.
pub fn tasks_added() -> Counter<u64> {
    meter()
        .u64_counter("taskq.tasks.added")
        .with_description("Number of tasks added to the queue")
        .build()
}

/// Counter: tasks moved to the back of the queue.
pub fn queue_rotations() -> Counter<u64> {
    meter()
        .u64_counter("taskq.queue.rotations")
        .with_description("Number of queue rotations")
        .build()
}

/// Counter: delete lifecycle changes.
/// Labels: `operation` ("soft_delete" | "restore" | "purge").
pub fn task_deletions() -> Counter<u64> {
    meter()
        .u64_counter("taskq.tasks.deleted")
        .with_description("Number of tasks soft-deleted, restored, or purged")
        .build()
}

/// Counter: work sessions opened or closed.
/// Labels: `to` ("active" | "closed").
pub fn session_transitions() -> Counter<u64> {
    meter()
        .u64_counter("taskq.sessions.transitions")
        .with_description("Number of work session starts and pauses")
        .build()
}
