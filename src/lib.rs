//! # taskq
//!
//! SQLite-backed personal work queue.
//!
//! Tasks rotate through a circular queue, can be soft-deleted and
//! restored in one batch, and carry timed work sessions that roll up
//! into "today" and "all-time" totals. Every write is one transaction.

pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod model;
pub mod storage;
pub mod telemetry;

pub use engine::{Engine, Moved, Toggled};
pub use error::{Error, Result};
