//! Work session clock: start, pause, toggle, and time aggregation.
//!
//! At most one open session exists per task. That is enforced by
//! checking for an open session and inserting inside the same
//! transaction.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, SubsecRound, TimeZone, Utc};
use opentelemetry::KeyValue;
use tracing::{debug, info};

use super::{Engine, Toggled, record_pause};
use crate::error::{Error, Result};
use crate::model::*;
use crate::storage::{self, TxContext};
use crate::telemetry::metrics;
use crate::telemetry::spans::operation_span;

/// Open a session for a live task that has none open.
pub(super) fn start_in(
    ctx: &TxContext<'_>,
    task_id: TaskId,
    now: DateTime<Utc>,
) -> Result<WorkSession> {
    if ctx.get_live_task(task_id)?.is_none() {
        return Err(Error::NotFound(task_id));
    }
    if ctx.active_session(task_id)?.is_some() {
        return Err(Error::Conflict(task_id));
    }
    ctx.insert_session(task_id, now, None)
}

/// Close the task's open session, if it has one.
pub(super) fn pause_in(
    ctx: &TxContext<'_>,
    task_id: TaskId,
    now: DateTime<Utc>,
) -> Result<Option<WorkSession>> {
    let Some(session) = ctx.active_session(task_id)? else {
        return Ok(None);
    };

    // A clock that stepped backwards must not produce a negative interval.
    let end_time = now.max(session.start_time);
    ctx.close_session(session.id, end_time)?;

    Ok(Some(WorkSession {
        end_time: Some(end_time),
        ..session
    }))
}

/// `[start, end)` of a local calendar day, as UTC instants.
fn local_day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    (local_midnight(date), local_midnight(next))
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    // A DST jump can skip midnight; the day then starts at the first valid hour.
    (0..3)
        .find_map(|h| {
            Local
                .from_local_datetime(&(midnight + Duration::hours(h)))
                .earliest()
        })
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

impl Engine {
    /// Open a work session for a task.
    ///
    /// Fails with `Conflict` if one is already open. Use
    /// [`Engine::toggle_session`] when the current state is unknown.
    pub fn start_session(&mut self, task_id: TaskId) -> Result<WorkSession> {
        let _span = operation_span("start_session", Some(task_id)).entered();
        let now = storage::now();

        let session = self
            .storage
            .with_transaction(|ctx| start_in(ctx, task_id, now))?;

        record_start(&session);
        Ok(session)
    }

    /// Close the task's open session. Returns the closed session, or
    /// `None` when nothing was open.
    pub fn pause_session(&mut self, task_id: TaskId) -> Result<Option<WorkSession>> {
        let _span = operation_span("pause_session", Some(task_id)).entered();
        let now = storage::now();

        let paused = self
            .storage
            .with_transaction(|ctx| pause_in(ctx, task_id, now))?;

        if paused.is_none() {
            debug!(task_id = %task_id, "pause requested with no active session");
        }
        record_pause(paused.as_ref());

        Ok(paused)
    }

    /// Start a session if none is open, otherwise close the open one.
    pub fn toggle_session(&mut self, task_id: TaskId) -> Result<Toggled> {
        let _span = operation_span("toggle_session", Some(task_id)).entered();
        let now = storage::now();

        let toggled = self.storage.with_transaction(|ctx| {
            match pause_in(ctx, task_id, now)? {
                Some(paused) => Ok(Toggled::Paused(paused)),
                None => start_in(ctx, task_id, now).map(Toggled::Started),
            }
        })?;

        match &toggled {
            Toggled::Started(session) => record_start(session),
            Toggled::Paused(session) => record_pause(Some(session)),
        }

        Ok(toggled)
    }

    /// Store an interval that was timed elsewhere and is already over.
    pub fn record_session(
        &mut self,
        task_id: TaskId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<WorkSession> {
        let _span = operation_span("record_session", Some(task_id)).entered();
        let start_time = start_time.trunc_subsecs(0);
        let end_time = end_time.trunc_subsecs(0);

        if end_time < start_time {
            return Err(Error::Validation(format!(
                "session ends at {end_time} before it starts at {start_time}"
            )));
        }
        for t in [start_time, end_time] {
            if !(0..=9999).contains(&t.year()) {
                return Err(Error::Validation(format!(
                    "session time {t} is outside years 0000-9999"
                )));
            }
        }

        let session = self.storage.with_transaction(|ctx| {
            if ctx.get_live_task(task_id)?.is_none() {
                return Err(Error::NotFound(task_id));
            }
            ctx.insert_session(task_id, start_time, Some(end_time))
        })?;

        info!(
            task_id = %task_id,
            session_id = %session.id,
            seconds = session.elapsed_seconds(end_time),
            "work session recorded"
        );

        Ok(session)
    }

    pub fn has_active_session(&self, task_id: TaskId) -> Result<bool> {
        Ok(self.storage.active_session(task_id)?.is_some())
    }

    pub fn active_session(&self, task_id: TaskId) -> Result<Option<WorkSession>> {
        self.storage.active_session(task_id)
    }

    /// Every session recorded for a task, oldest first.
    pub fn sessions(&self, task_id: TaskId) -> Result<Vec<WorkSession>> {
        self.storage.list_sessions(task_id)
    }

    /// Seconds of closed sessions that started today (local time).
    pub fn daily_seconds(&self, task_id: TaskId) -> Result<i64> {
        self.daily_seconds_on(task_id, Local::now().date_naive())
    }

    /// Seconds of closed sessions that started on the given local day.
    pub fn daily_seconds_on(&self, task_id: TaskId, date: NaiveDate) -> Result<i64> {
        self.storage
            .closed_seconds(task_id, Some(local_day_window(date)))
    }

    /// Seconds of all closed sessions, regardless of date.
    pub fn total_seconds(&self, task_id: TaskId) -> Result<i64> {
        self.storage.closed_seconds(task_id, None)
    }

    /// Open-session elapsed time plus daily and all-time totals, read from
    /// one snapshot.
    pub fn time_summary(&self, task_id: TaskId) -> Result<TimeSummary> {
        let now = storage::now();
        let today = local_day_window(Local::now().date_naive());

        self.storage.with_snapshot(|ctx| {
            let active = ctx.active_session(task_id)?;
            Ok(TimeSummary {
                task_id,
                active_seconds: active.map(|s| s.elapsed_seconds(now)),
                daily_seconds: ctx.closed_seconds(task_id, Some(today))?,
                total_seconds: ctx.closed_seconds(task_id, None)?,
            })
        })
    }
}

fn record_start(session: &WorkSession) {
    metrics::session_transitions().add(1, &[KeyValue::new("to", "active")]);
    info!(
        task_id = %session.task_id,
        session_id = %session.id,
        "work session started"
    );
}
