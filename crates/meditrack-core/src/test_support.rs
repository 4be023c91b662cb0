//! In-memory fakes for the collaborator traits, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::entry::{Dose, NewEntry, ScheduleEntry, WeekdaySet};
use crate::error::{CoreError, DatabaseError, Result, TimerError};
use crate::events::{DeletedEntrySummary, DoseEvent};
use crate::orchestrator::TimerKey;
use crate::services::{EntryStore, EventLog, KvStore, Notifier, TimerService};

/// In-memory entry store, event log, and kv store in one.
#[derive(Default)]
pub struct FakeStore {
    entries: Mutex<HashMap<i64, ScheduleEntry>>,
    next_id: AtomicUsize,
    events: Mutex<Vec<DoseEvent>>,
    summaries: Mutex<Vec<DeletedEntrySummary>>,
    kv: Mutex<HashMap<String, String>>,
    fail_log_writes: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            ..Self::default()
        }
    }

    pub fn create_entry(
        &self,
        name: &str,
        dose: Dose,
        time: NaiveTime,
        days: WeekdaySet,
    ) -> Result<ScheduleEntry> {
        self.create(&NewEntry {
            name: name.into(),
            dose,
            time,
            days,
        })
    }

    /// Make every event-log write fail from now on.
    pub fn fail_log_writes(&self) {
        self.fail_log_writes.store(true, Ordering::SeqCst);
    }

    fn log_failure(&self) -> Result<()> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            Err(CoreError::Database(DatabaseError::QueryFailed(
                "injected log failure".into(),
            )))
        } else {
            Ok(())
        }
    }
}

impl EntryStore for FakeStore {
    fn create(&self, entry: &NewEntry) -> Result<ScheduleEntry> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
        let stored = ScheduleEntry {
            id,
            name: entry.name.clone(),
            dose: entry.dose,
            time: entry.time,
            days: entry.days,
            consumed_today: false,
        };
        self.entries.lock().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    fn get(&self, id: i64) -> Result<Option<ScheduleEntry>> {
        Ok(self.entries.lock().unwrap().get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<ScheduleEntry>> {
        let mut entries: Vec<_> = self.entries.lock().unwrap().values().cloned().collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    fn update_consumed(&self, id: i64, consumed: bool) -> Result<()> {
        match self.entries.lock().unwrap().get_mut(&id) {
            Some(entry) => {
                entry.consumed_today = consumed;
                Ok(())
            }
            None => Err(CoreError::NotFound { id }),
        }
    }

    fn update_entry(&self, id: i64, entry: &NewEntry) -> Result<()> {
        match self.entries.lock().unwrap().get_mut(&id) {
            Some(stored) => {
                stored.name = entry.name.clone();
                stored.dose = entry.dose;
                stored.time = entry.time;
                stored.days = entry.days;
                Ok(())
            }
            None => Err(CoreError::NotFound { id }),
        }
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.entries.lock().unwrap().remove(&id);
        Ok(())
    }
}

impl EventLog for FakeStore {
    fn append_or_update_scheduled(&self, entry: &ScheduleEntry, date: NaiveDate) -> Result<()> {
        self.log_failure()?;
        let mut events = self.events.lock().unwrap();
        if events.iter().any(|e| e.entry_id == entry.id && e.date == date) {
            return Ok(());
        }
        events.push(DoseEvent {
            entry_id: entry.id,
            name: entry.name.clone(),
            dose: entry.dose.as_str().into(),
            scheduled: entry.time,
            actual: None,
            taken: false,
            deleted: false,
            date,
        });
        Ok(())
    }

    fn mark_taken(&self, entry_id: i64, date: NaiveDate, actual: NaiveTime) -> Result<bool> {
        self.log_failure()?;
        let mut events = self.events.lock().unwrap();
        match events
            .iter_mut()
            .find(|e| e.entry_id == entry_id && e.date == date)
        {
            Some(event) => {
                event.taken = true;
                event.actual = Some(actual);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn archive_on_delete(
        &self,
        entry: &ScheduleEntry,
        deleted_on: NaiveDate,
    ) -> Result<DeletedEntrySummary> {
        self.log_failure()?;
        let mut events = self.events.lock().unwrap();
        let total = events.iter().filter(|e| e.entry_id == entry.id).count() as u32;
        let taken = events
            .iter()
            .filter(|e| e.entry_id == entry.id && e.taken)
            .count() as u32;
        for event in events.iter_mut().filter(|e| e.entry_id == entry.id) {
            event.deleted = true;
        }
        let summary = DeletedEntrySummary {
            name: entry.name.clone(),
            dose: entry.dose.as_str().into(),
            time: entry.time,
            days: entry.days,
            deleted_on,
            total_doses: total,
            taken_doses: taken,
        };
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(summary)
    }

    fn events(&self) -> Result<Vec<DoseEvent>> {
        Ok(self.events.lock().unwrap().clone())
    }

    fn summaries(&self) -> Result<Vec<DeletedEntrySummary>> {
        Ok(self.summaries.lock().unwrap().clone())
    }
}

impl KvStore for FakeStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv.lock().unwrap().insert(key.into(), value.into());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InstalledTimer {
    pub code: i64,
    pub first: NaiveDateTime,
    pub period: Duration,
    pub payload: TimerKey,
}

/// Timer service fake that records installs and can fail after N calls.
pub struct RecordingTimers {
    installed: Mutex<Vec<InstalledTimer>>,
    calls: AtomicUsize,
    fail_after: AtomicUsize,
    fail_next: AtomicUsize,
}

impl RecordingTimers {
    pub fn new() -> Self {
        Self {
            installed: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_after: AtomicUsize::new(usize::MAX),
            fail_next: AtomicUsize::new(0),
        }
    }

    pub fn fail_after(&self, calls: usize) {
        self.fail_after.store(calls, Ordering::SeqCst);
    }

    /// Fail only the next `calls` installs, then recover.
    pub fn fail_next(&self, calls: usize) {
        self.fail_next.store(calls, Ordering::SeqCst);
    }

    pub fn installed(&self) -> Vec<InstalledTimer> {
        self.installed.lock().unwrap().clone()
    }
}

impl TimerService for RecordingTimers {
    fn schedule_repeating(
        &self,
        key: i64,
        first: NaiveDateTime,
        period: Duration,
        payload: TimerKey,
    ) -> Result<(), TimerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_after.load(Ordering::SeqCst) {
            return Err(TimerError::Unavailable("injected timer failure".into()));
        }
        let transient = self.fail_next.load(Ordering::SeqCst);
        if transient > 0 {
            self.fail_next.store(transient - 1, Ordering::SeqCst);
            return Err(TimerError::Unavailable("injected timer failure".into()));
        }
        let mut installed = self.installed.lock().unwrap();
        installed.retain(|t| t.code != key);
        installed.push(InstalledTimer {
            code: key,
            first,
            period,
            payload,
        });
        Ok(())
    }

    fn cancel(&self, key: i64) -> Result<(), TimerError> {
        self.installed.lock().unwrap().retain(|t| t.code != key);
        Ok(())
    }
}

/// Notifier fake that records every surfaced notification.
pub struct RecordingNotifier {
    reminders: Mutex<Vec<String>>,
    escalations: Mutex<Vec<String>>,
    confirmations: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            reminders: Mutex::new(Vec::new()),
            escalations: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
        }
    }

    pub fn reminders(&self) -> Vec<String> {
        self.reminders.lock().unwrap().clone()
    }

    pub fn escalations(&self) -> Vec<String> {
        self.escalations.lock().unwrap().clone()
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn is_silent(&self) -> bool {
        self.reminders().is_empty() && self.escalations().is_empty() && self.confirmations().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_reminder(&self, name: &str, dose: &str, _entry_id: i64) {
        self.reminders.lock().unwrap().push(format!("{name} - {dose}"));
    }

    fn notify_escalation(&self, name: &str, dose: &str, _entry_id: i64) {
        self.escalations.lock().unwrap().push(format!("{name} - {dose}"));
    }

    fn notify_confirmation(&self, message: &str) {
        self.confirmations.lock().unwrap().push(message.into());
    }
}
