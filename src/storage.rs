//! SQLite storage layer.
//!
//! Single source of truth for tasks and work sessions. Nothing is cached
//! in memory between calls. Every write runs inside a transaction opened
//! by the engine.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::model::*;

/// Storage backend. Owns the SQLite connection.
pub struct Storage {
    conn: Connection,
}

/// Handle for performing storage operations within a transaction.
///
/// All methods delegate to the same SQL as `Storage`, but execute
/// against the transaction's connection, so a closure passed to
/// [`Storage::with_transaction`] commits or rolls back as one unit.
pub(crate) struct TxContext<'a> {
    tx: &'a Connection,
}

impl TxContext<'_> {
    pub fn insert_task(&self, name: &str, created_at: DateTime<Utc>) -> Result<Task> {
        insert_task_on(self.tx, name, created_at)
    }

    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        get_task_on(self.tx, id)
    }

    pub fn get_live_task(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(get_task_on(self.tx, id)?.filter(|t| !t.is_deleted()))
    }

    pub fn next_queue_order(&self) -> Result<i64> {
        next_queue_order_on(self.tx)
    }

    pub fn set_queue_order(&self, id: TaskId, queue_order: i64) -> Result<bool> {
        set_queue_order_on(self.tx, id, queue_order)
    }

    pub fn mark_deleted(&self, id: TaskId) -> Result<bool> {
        mark_deleted_on(self.tx, id)
    }

    pub fn restore_deleted(&self) -> Result<usize> {
        restore_deleted_on(self.tx)
    }

    pub fn purge_deleted(&self) -> Result<usize> {
        purge_deleted_on(self.tx)
    }

    pub fn rename_task(&self, id: TaskId, name: &str) -> Result<bool> {
        rename_task_on(self.tx, id, name)
    }

    pub fn insert_session(
        &self,
        task_id: TaskId,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<WorkSession> {
        insert_session_on(self.tx, task_id, start_time, end_time)
    }

    pub fn active_session(&self, task_id: TaskId) -> Result<Option<WorkSession>> {
        active_session_on(self.tx, task_id)
    }

    pub fn close_session(&self, id: SessionId, end_time: DateTime<Utc>) -> Result<bool> {
        close_session_on(self.tx, id, end_time)
    }

    pub fn closed_seconds(
        &self,
        task_id: TaskId,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<i64> {
        closed_seconds_on(self.tx, task_id, window)
    }
}

impl Storage {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    fn init(&self) -> Result<()> {
        // In-memory databases answer "memory"; either answer is fine.
        let _mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        // work_sessions.task_id has no foreign key: session history
        // outlives purged tasks. AUTOINCREMENT keeps a purged task's id
        // from being handed to a new task.
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                queue_order     INTEGER NOT NULL,
                created_at      TEXT NOT NULL,
                is_deleted      INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_queue ON tasks(is_deleted, queue_order);

            CREATE TABLE IF NOT EXISTS work_sessions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id         INTEGER NOT NULL,
                start_time      TEXT NOT NULL,
                end_time        TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_task ON work_sessions(task_id, end_time);
            ",
        )?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Execute a closure within a SQLite transaction.
    ///
    /// The transaction commits if the closure returns Ok. On Err the
    /// transaction is dropped, which rolls it back.
    pub(crate) fn with_transaction<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&TxContext<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let ctx = TxContext { tx: &tx };
        let result = f(&ctx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Run several reads against one consistent snapshot.
    ///
    /// Opens a deferred transaction that never writes, so it does not
    /// need exclusive access to the connection.
    pub(crate) fn with_snapshot<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TxContext<'_>) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let ctx = TxContext { tx: &tx };
        let result = f(&ctx)?;
        tx.commit()?;
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Get a task by ID, live or soft-deleted.
    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        get_task_on(&self.conn, id)
    }

    /// The live task with the smallest queue order.
    pub fn current_task(&self) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, name, queue_order, created_at, is_deleted FROM tasks
                 WHERE is_deleted = 0
                 ORDER BY queue_order ASC
                 LIMIT 1",
                [],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Number of live tasks.
    pub fn queue_size(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All live tasks in queue order.
    pub fn list_live_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, queue_order, created_at, is_deleted FROM tasks
             WHERE is_deleted = 0
             ORDER BY queue_order ASC",
        )?;

        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    /// Whether any task is soft-deleted and still restorable.
    pub fn has_deleted_task(&self) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE is_deleted = 1)",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // -----------------------------------------------------------------------
    // Work Sessions
    // -----------------------------------------------------------------------

    /// The open session for a task, if any.
    pub fn active_session(&self, task_id: TaskId) -> Result<Option<WorkSession>> {
        active_session_on(&self.conn, task_id)
    }

    /// Sum of closed-session seconds for a task. With a window, only
    /// sessions whose start falls in `[from, to)` count.
    pub fn closed_seconds(
        &self,
        task_id: TaskId,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<i64> {
        closed_seconds_on(&self.conn, task_id, window)
    }

    /// Every session recorded for a task, oldest first.
    pub fn list_sessions(&self, task_id: TaskId) -> Result<Vec<WorkSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, start_time, end_time FROM work_sessions
             WHERE task_id = ?1
             ORDER BY start_time ASC, id ASC",
        )?;

        let sessions = stmt
            .query_map(params![task_id.0], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }
}

// ---------------------------------------------------------------------------
// Inner functions. Accept &Connection so they work with both
// Connection (auto-commit) and Transaction (deref to Connection).
// ---------------------------------------------------------------------------

fn insert_task_on(conn: &Connection, name: &str, created_at: DateTime<Utc>) -> Result<Task> {
    let queue_order = next_queue_order_on(conn)?;

    conn.execute(
        "INSERT INTO tasks (name, queue_order, created_at, is_deleted) VALUES (?1, ?2, ?3, 0)",
        params![name, queue_order, encode_timestamp(created_at)],
    )?;

    Ok(Task {
        id: TaskId(conn.last_insert_rowid()),
        name: name.to_string(),
        queue_order,
        created_at,
        state: TaskState::Active,
    })
}

fn get_task_on(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT id, name, queue_order, created_at, is_deleted FROM tasks WHERE id = ?1",
            params![id.0],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

/// One past the largest order key ever handed out, counting soft-deleted
/// rows too.
fn next_queue_order_on(conn: &Connection) -> Result<i64> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(queue_order), 0) + 1 FROM tasks",
        [],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn set_queue_order_on(conn: &Connection, id: TaskId, queue_order: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET queue_order = ?1 WHERE id = ?2 AND is_deleted = 0",
        params![queue_order, id.0],
    )?;
    Ok(changed == 1)
}

fn mark_deleted_on(conn: &Connection, id: TaskId) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
        params![id.0],
    )?;
    Ok(changed == 1)
}

fn restore_deleted_on(conn: &Connection) -> Result<usize> {
    let restored = conn.execute("UPDATE tasks SET is_deleted = 0 WHERE is_deleted = 1", [])?;
    Ok(restored)
}

fn purge_deleted_on(conn: &Connection) -> Result<usize> {
    let purged = conn.execute("DELETE FROM tasks WHERE is_deleted = 1", [])?;
    Ok(purged)
}

fn rename_task_on(conn: &Connection, id: TaskId, name: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET name = ?1 WHERE id = ?2",
        params![name, id.0],
    )?;
    Ok(changed == 1)
}

fn insert_session_on(
    conn: &Connection,
    task_id: TaskId,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
) -> Result<WorkSession> {
    conn.execute(
        "INSERT INTO work_sessions (task_id, start_time, end_time) VALUES (?1, ?2, ?3)",
        params![
            task_id.0,
            encode_timestamp(start_time),
            end_time.map(encode_timestamp),
        ],
    )?;

    Ok(WorkSession {
        id: SessionId(conn.last_insert_rowid()),
        task_id,
        start_time,
        end_time,
    })
}

fn active_session_on(conn: &Connection, task_id: TaskId) -> Result<Option<WorkSession>> {
    let session = conn
        .query_row(
            "SELECT id, task_id, start_time, end_time FROM work_sessions
             WHERE task_id = ?1 AND end_time IS NULL
             ORDER BY start_time DESC, id DESC
             LIMIT 1",
            params![task_id.0],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// Set the end time of an open session. An already-closed session is
/// left untouched and reported as `false`.
fn close_session_on(conn: &Connection, id: SessionId, end_time: DateTime<Utc>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE work_sessions SET end_time = ?1 WHERE id = ?2 AND end_time IS NULL",
        params![encode_timestamp(end_time), id.0],
    )?;
    Ok(changed == 1)
}

fn closed_seconds_on(
    conn: &Connection,
    task_id: TaskId,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<i64> {
    let (from, to) = match window {
        Some((from, to)) => (Some(encode_timestamp(from)), Some(encode_timestamp(to))),
        None => (None, None),
    };

    // Timestamps are fixed-width UTC text, so string comparison is
    // chronological comparison.
    let seconds: i64 = conn.query_row(
        "SELECT COALESCE(SUM(MAX(0,
                    CAST(strftime('%s', end_time) AS INTEGER)
                  - CAST(strftime('%s', start_time) AS INTEGER))), 0)
         FROM work_sessions
         WHERE task_id = ?1
           AND end_time IS NOT NULL
           AND (?2 IS NULL OR (start_time >= ?2 AND start_time < ?3))",
        params![task_id.0, from, to],
        |row| row.get(0),
    )?;
    Ok(seconds)
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current time at store resolution (whole seconds).
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Fixed-width `YYYY-MM-DDTHH:MM:SSZ`.
pub(crate) fn encode_timestamp(t: DateTime<Utc>) -> String {
    t.trunc_subsecs(0).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn decode_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

// ---------------------------------------------------------------------------
// Row parsing helpers
// ---------------------------------------------------------------------------

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let created_str: String = row.get(3)?;
    let is_deleted: bool = row.get(4)?;

    Ok(Task {
        id: TaskId(row.get(0)?),
        name: row.get(1)?,
        queue_order: row.get(2)?,
        created_at: decode_timestamp(3, &created_str)?,
        state: TaskState::from_flag(is_deleted),
    })
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<WorkSession> {
    let start_str: String = row.get(2)?;
    let end_str: Option<String> = row.get(3)?;

    Ok(WorkSession {
        id: SessionId(row.get(0)?),
        task_id: TaskId(row.get(1)?),
        start_time: decode_timestamp(2, &start_str)?,
        end_time: end_str.map(|s| decode_timestamp(3, &s)).transpose()?,
    })
}
