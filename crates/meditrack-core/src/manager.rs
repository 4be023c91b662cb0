//! Schedule entry lifecycle.
//!
//! The manager pairs every entry mutation with the matching timer work:
//! creation installs the weekly timers, edits reinstall them against the
//! new fields, and deletion cancels them and archives the entry's
//! analytics history.

use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime};

use crate::entry::{NewEntry, ScheduleEntry};
use crate::error::Result;
use crate::events::DeletedEntrySummary;
use crate::orchestrator::AlarmOrchestrator;
use crate::services::{require_entry, EntryStore, EventLog};

pub struct ScheduleManager {
    store: Arc<dyn EntryStore>,
    log: Arc<dyn EventLog>,
    orchestrator: Arc<AlarmOrchestrator>,
}

impl ScheduleManager {
    pub fn new(
        store: Arc<dyn EntryStore>,
        log: Arc<dyn EventLog>,
        orchestrator: Arc<AlarmOrchestrator>,
    ) -> Self {
        Self {
            store,
            log,
            orchestrator,
        }
    }

    /// Validate, persist, and arm timers for a new entry.
    ///
    /// If timer installation fails the stored row is removed again, so a
    /// failed create leaves neither a row nor timers behind.
    pub fn create(&self, entry: &NewEntry, now: NaiveDateTime) -> Result<ScheduleEntry> {
        entry.validate()?;
        let created = self.store.create(entry)?;
        if let Err(err) = self.orchestrator.install(&created, now) {
            let _ = self.store.delete(created.id);
            return Err(err);
        }
        Ok(created)
    }

    /// Replace an entry's fields and reinstall its timers.
    ///
    /// The old timer set is cancelled against the old weekdays before the
    /// row changes; timers are then armed from the edited fields. If that
    /// installation fails, the previous fields and timers are put back so
    /// the entry never survives with nothing armed.
    pub fn update(&self, id: i64, entry: &NewEntry, now: NaiveDateTime) -> Result<ScheduleEntry> {
        entry.validate()?;
        let existing = require_entry(self.store.as_ref(), id)?;
        self.orchestrator.cancel(&existing)?;
        self.store.update_entry(id, entry)?;
        let updated = require_entry(self.store.as_ref(), id)?;
        if let Err(err) = self.orchestrator.install(&updated, now) {
            let previous = NewEntry {
                name: existing.name.clone(),
                dose: existing.dose,
                time: existing.time,
                days: existing.days,
            };
            let _ = self.store.update_entry(id, &previous);
            let _ = self.orchestrator.install(&existing, now);
            return Err(err);
        }
        Ok(updated)
    }

    /// Cancel timers, archive the analytics history, and remove the entry.
    pub fn delete(&self, id: i64, now: NaiveDateTime) -> Result<DeletedEntrySummary> {
        let entry = require_entry(self.store.as_ref(), id)?;
        self.orchestrator.cancel(&entry)?;
        let summary = self.log.archive_on_delete(&entry, now.date())?;
        self.store.delete(id)?;
        Ok(summary)
    }

    pub fn get(&self, id: i64) -> Result<ScheduleEntry> {
        require_entry(self.store.as_ref(), id)
    }

    pub fn list(&self) -> Result<Vec<ScheduleEntry>> {
        self.store.list()
    }

    /// Entries whose schedule includes today's weekday.
    pub fn due_today(&self, now: NaiveDateTime) -> Result<Vec<ScheduleEntry>> {
        let today = now.weekday();
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|e| e.days.contains(today))
            .collect())
    }
}
