//! Dose acknowledgment.
//!
//! Marks an entry as taken for today, merges the taken half into the
//! day's DoseEvent, and confirms to the user. Idempotent: acknowledging
//! the same entry twice in one day is observably identical to doing it
//! once.
//!
//! The weekly timers are left untouched. Today's pending escalation is
//! suppressed at fire time through the consumed flag, and the same timer
//! must still fire on every later week.

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;

use crate::error::{CoreError, Result};
use crate::services::{require_entry, EntryStore, EventLog, Notifier};

/// Handles "mark as taken" from the notification action or the UI.
pub struct AckHandler {
    store: Arc<dyn EntryStore>,
    log: Arc<dyn EventLog>,
    notifier: Arc<dyn Notifier>,
    /// Exclusion scope shared with the daily reset so an acknowledgment
    /// racing the midnight reset never interleaves partially.
    state_lock: Arc<Mutex<()>>,
}

impl AckHandler {
    pub fn new(
        store: Arc<dyn EntryStore>,
        log: Arc<dyn EventLog>,
        notifier: Arc<dyn Notifier>,
        state_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            log,
            notifier,
            state_lock,
        }
    }

    /// Record that the dose was taken now.
    ///
    /// Fails with [`CoreError::NotFound`] for an unknown id. Once the
    /// consumed flag is written it is honored even when a later step
    /// fails: the remaining steps still run and the first failure is
    /// returned at the end, never rolling the flag back. The worse
    /// failure mode is a false "not taken", not a duplicate "taken".
    pub fn acknowledge(&self, entry_id: i64, now: NaiveDateTime) -> Result<()> {
        let _guard = self.state_lock.lock().unwrap_or_else(|e| e.into_inner());

        let entry = require_entry(self.store.as_ref(), entry_id)?;
        if entry.consumed_today {
            return Ok(());
        }

        self.store.update_consumed(entry_id, true)?;

        let mut deferred: Option<CoreError> = None;

        // Merge the taken half into today's row. An acknowledgment without
        // a prior scheduling log is a logical inconsistency; late-create
        // the row rather than failing the user action.
        match self.log.mark_taken(entry_id, now.date(), now.time()) {
            Ok(true) => {}
            Ok(false) => {
                let late = self
                    .log
                    .append_or_update_scheduled(&entry, now.date())
                    .and_then(|_| self.log.mark_taken(entry_id, now.date(), now.time()));
                if let Err(err) = late {
                    deferred.get_or_insert(err);
                }
            }
            Err(err) => {
                deferred.get_or_insert(err);
            }
        }

        self.notifier
            .notify_confirmation(&format!("{} marked as taken", entry.name));

        match deferred {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Dose, WeekdaySet};
    use crate::orchestrator::{AlarmOrchestrator, FireDecision, TimerKey};
    use crate::planner::{Phase, TriggerPlanner};
    use crate::test_support::{FakeStore, RecordingNotifier, RecordingTimers};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    struct Fixture {
        store: Arc<FakeStore>,
        timers: Arc<RecordingTimers>,
        notifier: Arc<RecordingNotifier>,
        orchestrator: Arc<AlarmOrchestrator>,
        handler: AckHandler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(FakeStore::new());
        let timers = Arc::new(RecordingTimers::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let orchestrator = Arc::new(AlarmOrchestrator::new(
            TriggerPlanner::new(),
            store.clone(),
            timers.clone(),
            notifier.clone(),
            store.clone(),
        ));
        let handler = AckHandler::new(
            store.clone(),
            store.clone(),
            notifier.clone(),
            Arc::new(Mutex::new(())),
        );
        Fixture {
            store,
            timers,
            notifier,
            orchestrator,
            handler,
        }
    }

    fn wednesday_ten() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 17)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn add_entry(f: &Fixture) -> crate::entry::ScheduleEntry {
        f.store
            .create_entry(
                "Aspirin",
                Dose::One,
                NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                "Wednesday".parse::<WeekdaySet>().unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn acknowledge_sets_flag_and_merges_taken_half() {
        let f = fixture();
        let entry = add_entry(&f);
        let now = wednesday_ten();
        f.store
            .append_or_update_scheduled(&entry, now.date())
            .unwrap();

        f.handler.acknowledge(entry.id, now).unwrap();

        assert!(f.store.get(entry.id).unwrap().unwrap().consumed_today);
        let events = f.store.events().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].taken);
        assert_eq!(events[0].actual, Some(now.time()));
        assert_eq!(f.notifier.confirmations().len(), 1);
    }

    #[test]
    fn acknowledge_twice_is_idempotent() {
        let f = fixture();
        let entry = add_entry(&f);
        let now = wednesday_ten();

        f.handler.acknowledge(entry.id, now).unwrap();
        f.handler.acknowledge(entry.id, now).unwrap();

        let events = f.store.events().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].taken);
        assert_eq!(f.notifier.confirmations().len(), 1);
    }

    #[test]
    fn acknowledge_without_scheduled_row_late_creates_it() {
        let f = fixture();
        let entry = add_entry(&f);
        let now = wednesday_ten();

        f.handler.acknowledge(entry.id, now).unwrap();

        let events = f.store.events().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].taken);
        assert_eq!(events[0].date, now.date());
    }

    #[test]
    fn acknowledge_leaves_the_weekly_timers_armed() {
        let f = fixture();
        let entry = add_entry(&f);
        let now = wednesday_ten();
        f.orchestrator.install(&entry, now).unwrap();
        assert_eq!(f.timers.installed().len(), 2);

        f.handler.acknowledge(entry.id, now).unwrap();

        // Both phases keep repeating; next week's escalation depends on it.
        let remaining = f.timers.installed();
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .any(|t| t.payload.phase == Phase::Escalation));
    }

    #[test]
    fn escalation_after_acknowledge_is_suppressed() {
        let f = fixture();
        let entry = add_entry(&f);
        let now = wednesday_ten();

        f.handler.acknowledge(entry.id, now).unwrap();
        // Today's escalation still fires but must stay silent.
        let decision = f
            .orchestrator
            .on_fire(TimerKey::new(entry.id, Weekday::Wed, Phase::Escalation), now)
            .unwrap();

        assert_eq!(decision, FireDecision::AlreadyTaken);
        assert!(f.notifier.escalations().is_empty());
    }

    #[test]
    fn unknown_entry_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.handler.acknowledge(42, wednesday_ten()),
            Err(CoreError::NotFound { id: 42 })
        ));
    }

    #[test]
    fn log_failure_keeps_the_flag_and_surfaces_the_error() {
        let f = fixture();
        let entry = add_entry(&f);
        f.store.fail_log_writes();

        let result = f.handler.acknowledge(entry.id, wednesday_ten());

        assert!(result.is_err());
        assert!(f.store.get(entry.id).unwrap().unwrap().consumed_today);
        // The user still got their confirmation.
        assert_eq!(f.notifier.confirmations().len(), 1);
    }
}
