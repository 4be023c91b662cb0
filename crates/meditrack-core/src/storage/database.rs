//! SQLite store for schedule entries, the analytics log, and process
//! state.
//!
//! One database file holds the live `medicines` table, the `dose_log`
//! analytics trail, the `deleted_medicines` archive, and a small kv
//! table. The store is the single write path for all of them; every
//! component mutating shared state goes through these methods.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::entry::{Dose, NewEntry, ScheduleEntry, WeekdaySet};
use crate::error::{CoreError, DatabaseError, Result};
use crate::events::{DeletedEntrySummary, DoseEvent};
use crate::services::{EntryStore, EventLog, KvStore};

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed entry store, event log, and kv store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at `~/.config/meditrack/meditrack.db`, creating
    /// the file and schema if needed.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("meditrack.db");
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path).map_err(|source| {
            CoreError::Database(DatabaseError::OpenFailed { path, source })
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
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
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| CoreError::Database(DatabaseError::CorruptRow(format!("time '{s}': {e}"))))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| CoreError::Database(DatabaseError::CorruptRow(format!("date '{s}': {e}"))))
}

struct EntryRow {
    id: i64,
    name: String,
    dose: String,
    time: String,
    days: String,
    is_consumed: bool,
}

fn decode_entry(row: EntryRow) -> Result<ScheduleEntry> {
    let dose: Dose = row
        .dose
        .parse()
        .map_err(|_| CoreError::Database(DatabaseError::CorruptRow(format!("dose '{}'", row.dose))))?;
    let days: WeekdaySet = row
        .days
        .parse()
        .map_err(|_| CoreError::Database(DatabaseError::CorruptRow(format!("days '{}'", row.days))))?;
    Ok(ScheduleEntry {
        id: row.id,
        name: row.name,
        dose,
        time: parse_time(&row.time)?,
        days,
        consumed_today: row.is_consumed,
    })
}

fn read_entry_row(row: &rusqlite::Row) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        dose: row.get(2)?,
        time: row.get(3)?,
        days: row.get(4)?,
        is_consumed: row.get::<_, i64>(5)? != 0,
    })
}

impl EntryStore for SqliteStore {
    fn create(&self, entry: &NewEntry) -> Result<ScheduleEntry> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO medicines (name, dose, time, days, is_consumed)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![
                entry.name,
                entry.dose.as_str(),
                format_time(entry.time),
                entry.days.to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(ScheduleEntry {
            id,
            name: entry.name.clone(),
            dose: entry.dose,
            time: entry.time,
            days: entry.days,
            consumed_today: false,
        })
    }

    fn get(&self, id: i64) -> Result<Option<ScheduleEntry>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, name, dose, time, days, is_consumed FROM medicines WHERE id = ?1",
                params![id],
                read_entry_row,
            )
            .optional()?;
        row.map(decode_entry).transpose()
    }

    fn list(&self) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, dose, time, days, is_consumed FROM medicines ORDER BY id",
        )?;
        let rows = stmt.query_map([], read_entry_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(decode_entry(row?)?);
        }
        Ok(entries)
    }

    fn update_consumed(&self, id: i64, consumed: bool) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE medicines SET is_consumed = ?1 WHERE id = ?2",
            params![consumed as i64, id],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound { id });
        }
        Ok(())
    }

    fn update_entry(&self, id: i64, entry: &NewEntry) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE medicines SET name = ?1, dose = ?2, time = ?3, days = ?4 WHERE id = ?5",
            params![
                entry.name,
                entry.dose.as_str(),
                format_time(entry.time),
                entry.days.to_string(),
                id,
            ],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound { id });
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM medicines WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(CoreError::NotFound { id });
        }
        Ok(())
    }
}

impl EventLog for SqliteStore {
    fn append_or_update_scheduled(&self, entry: &ScheduleEntry, date: NaiveDate) -> Result<()> {
        // The UNIQUE (medicine_id, date) constraint makes the first write
        // win; repeat calls are ignored.
        self.conn().execute(
            "INSERT OR IGNORE INTO dose_log
                 (medicine_id, medicine_name, scheduled_time, dose, was_taken, date, is_deleted)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, 0)",
            params![
                entry.id,
                entry.name,
                format_time(entry.time),
                entry.dose.as_str(),
                format_date(date),
            ],
        )?;
        Ok(())
    }

    fn mark_taken(&self, entry_id: i64, date: NaiveDate, actual: NaiveTime) -> Result<bool> {
        let updated = self.conn().execute(
            "UPDATE dose_log SET was_taken = 1, actual_time = ?1
             WHERE medicine_id = ?2 AND date = ?3",
            params![format_time(actual), entry_id, format_date(date)],
        )?;
        Ok(updated > 0)
    }

    fn archive_on_delete(
        &self,
        entry: &ScheduleEntry,
        deleted_on: NaiveDate,
    ) -> Result<DeletedEntrySummary> {
        let conn = self.conn();
        let (total, taken): (u32, u32) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(was_taken), 0) FROM dose_log WHERE medicine_id = ?1",
            params![entry.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        conn.execute(
            "INSERT INTO deleted_medicines
                 (name, dose, time, days, deletion_date, total_logs, taken_logs)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.name,
                entry.dose.as_str(),
                format_time(entry.time),
                entry.days.to_string(),
                format_date(deleted_on),
                total,
                taken,
            ],
        )?;
        conn.execute(
            "UPDATE dose_log SET is_deleted = 1 WHERE medicine_id = ?1",
            params![entry.id],
        )?;
        Ok(DeletedEntrySummary {
            name: entry.name.clone(),
            dose: entry.dose.as_str().into(),
            time: entry.time,
            days: entry.days,
            deleted_on,
            total_doses: total,
            taken_doses: taken,
        })
    }

    fn events(&self) -> Result<Vec<DoseEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT medicine_id, medicine_name, dose, scheduled_time, actual_time,
                    was_taken, is_deleted, date
             FROM dose_log ORDER BY date, medicine_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)? != 0,
                row.get::<_, i64>(6)? != 0,
                row.get::<_, String>(7)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (entry_id, name, dose, scheduled, actual, taken, deleted, date) = row?;
            events.push(DoseEvent {
                entry_id,
                name,
                dose,
                scheduled: parse_time(&scheduled)?,
                actual: actual.as_deref().map(parse_time).transpose()?,
                taken,
                deleted,
                date: parse_date(&date)?,
            });
        }
        Ok(events)
    }

    fn summaries(&self) -> Result<Vec<DeletedEntrySummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, dose, time, days, deletion_date, total_logs, taken_logs
             FROM deleted_medicines ORDER BY deleted_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, u32>(6)?,
            ))
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            let (name, dose, time, days, deleted_on, total, taken) = row?;
            summaries.push(DeletedEntrySummary {
                name,
                dose,
                time: parse_time(&time)?,
                days: days.parse().map_err(|_| {
                    CoreError::Database(DatabaseError::CorruptRow(format!("days '{days}'")))
                })?,
                deleted_on: parse_date(&deleted_on)?,
                total_doses: total,
                taken_doses: taken,
            });
        }
        Ok(summaries)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
