//! Capability traits for the external collaborators.
//!
//! The core never reaches for ambient singletons: the entry store, the
//! platform timer service, the notifier, and the analytics event log are
//! injected into each component as `Arc<dyn Trait>`. Production wires in
//! the SQLite implementations from [`crate::storage`]; tests substitute
//! in-memory fakes.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::entry::{NewEntry, ScheduleEntry};
use crate::error::{CoreError, Result, TimerError};
use crate::events::{DeletedEntrySummary, DoseEvent};
use crate::orchestrator::TimerKey;

/// Durable store of schedule entries. The single write path for the
/// consumed-today flag.
pub trait EntryStore: Send + Sync {
    fn create(&self, entry: &NewEntry) -> Result<ScheduleEntry>;
    fn get(&self, id: i64) -> Result<Option<ScheduleEntry>>;
    fn list(&self) -> Result<Vec<ScheduleEntry>>;
    /// Fails with [`CoreError::NotFound`] if no such entry exists.
    fn update_consumed(&self, id: i64, consumed: bool) -> Result<()>;
    /// Wholesale replacement of the editable fields.
    fn update_entry(&self, id: i64, entry: &NewEntry) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
}

/// Platform timer service.
///
/// `key` is the stable request code derived from a [`TimerKey`]; `payload`
/// is the structured triple handed back verbatim when the timer fires.
pub trait TimerService: Send + Sync {
    /// Arm a repeating timer: first firing at `first`, then every `period`.
    fn schedule_repeating(
        &self,
        key: i64,
        first: NaiveDateTime,
        period: Duration,
        payload: TimerKey,
    ) -> Result<(), TimerError>;

    /// Cancel the timer under `key`. Cancelling an unknown key is a no-op,
    /// never an error; cancellation is always safe to call speculatively.
    fn cancel(&self, key: i64) -> Result<(), TimerError>;
}

/// Notification delivery. Chrome (channels, actions, sound files) is the
/// implementation's concern; only the reminder phase is audible.
pub trait Notifier: Send + Sync {
    fn notify_reminder(&self, name: &str, dose: &str, entry_id: i64);
    fn notify_escalation(&self, name: &str, dose: &str, entry_id: i64);
    fn notify_confirmation(&self, message: &str);
}

/// Analytics event log: one DoseEvent per (entry, date), plus the archive
/// of deleted entries.
pub trait EventLog: Send + Sync {
    /// Write the scheduled half for (entry, date). First write wins;
    /// repeat calls for the same pair are no-ops.
    fn append_or_update_scheduled(&self, entry: &ScheduleEntry, date: NaiveDate) -> Result<()>;

    /// Apply the taken half to the existing row. Returns false when no
    /// scheduled row exists for the pair (the caller decides whether to
    /// late-create one).
    fn mark_taken(&self, entry_id: i64, date: NaiveDate, actual: NaiveTime) -> Result<bool>;

    /// Snapshot the entry's accumulated counts, mark its rows deleted, and
    /// return the written summary.
    fn archive_on_delete(
        &self,
        entry: &ScheduleEntry,
        deleted_on: NaiveDate,
    ) -> Result<DeletedEntrySummary>;

    fn events(&self) -> Result<Vec<DoseEvent>>;
    fn summaries(&self) -> Result<Vec<DeletedEntrySummary>>;
}

/// Small durable key-value store for process state such as the last daily
/// reset date.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Convenience for callers that hold an id but need the entry or a
/// NotFound error.
pub fn require_entry(store: &dyn EntryStore, id: i64) -> Result<ScheduleEntry> {
    store.get(id)?.ok_or(CoreError::NotFound { id })
}
