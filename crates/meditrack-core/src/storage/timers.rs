//! Durable timer queue backed by the `timers` table.
//!
//! A headless process has no platform alarm manager, so repeating timers
//! are persisted as (key, payload, next_fire, period) rows and polled.
//! `due` drains every row whose fire instant has passed and advances it
//! by whole periods, preserving the weekday anchoring of the first
//! instant.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result, TimerError};
use crate::orchestrator::TimerKey;
use crate::services::TimerService;

const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed repeating timer service.
pub struct SqliteTimerService {
    conn: Mutex<Connection>,
}

impl SqliteTimerService {
    /// Open the timer queue in the shared application database file.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("meditrack.db");
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path).map_err(|source| {
            CoreError::Database(DatabaseError::OpenFailed { path, source })
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Database(DatabaseError::QueryFailed(e.to_string())))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| CoreError::Database(DatabaseError::MigrationFailed(e.to_string())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drain every timer due at `now`, returning their payloads in fire
    /// order. Each drained timer is rearmed at its next period boundary
    /// after `now`, so a process that slept through several periods
    /// delivers each timer once, not once per missed period.
    pub fn due(&self, now: NaiveDateTime) -> Result<Vec<TimerKey>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT key, payload, next_fire, period_minutes FROM timers
             WHERE next_fire <= ?1 ORDER BY next_fire",
        )?;
        let rows = stmt.query_map(params![now.format(INSTANT_FORMAT).to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut fired = Vec::new();
        let mut rearm = Vec::new();
        for row in rows {
            let (key, payload, next_fire, period_minutes) = row?;
            let payload: TimerKey = serde_json::from_str(&payload)
                .map_err(|e| CoreError::Database(DatabaseError::CorruptRow(e.to_string())))?;
            let mut at = parse_instant(&next_fire)?;
            let period = Duration::minutes(period_minutes);
            while at <= now {
                at += period;
            }
            fired.push(payload);
            rearm.push((key, at));
        }
        drop(stmt);

        for (key, at) in rearm {
            conn.execute(
                "UPDATE timers SET next_fire = ?1 WHERE key = ?2",
                params![at.format(INSTANT_FORMAT).to_string(), key],
            )?;
        }
        Ok(fired)
    }
}

fn parse_instant(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, INSTANT_FORMAT)
        .map_err(|e| CoreError::Database(DatabaseError::CorruptRow(format!("instant '{s}': {e}"))))
}

impl TimerService for SqliteTimerService {
    fn schedule_repeating(
        &self,
        key: i64,
        first: NaiveDateTime,
        period: Duration,
        payload: TimerKey,
    ) -> Result<(), TimerError> {
        let payload = serde_json::to_string(&payload)
            .map_err(|e| TimerError::Unavailable(e.to_string()))?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO timers (key, payload, next_fire, period_minutes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    key,
                    payload,
                    first.format(INSTANT_FORMAT).to_string(),
                    period.num_minutes(),
                ],
            )
            .map_err(|e| TimerError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn cancel(&self, key: i64) -> Result<(), TimerError> {
        self.conn()
            .execute("DELETE FROM timers WHERE key = ?1", params![key])
            .map_err(|e| TimerError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
