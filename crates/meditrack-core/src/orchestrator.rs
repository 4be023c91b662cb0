//! Alarm orchestration.
//!
//! The orchestrator owns the process-wide mapping from (entry, weekday,
//! phase) to an external repeating timer. It arms the timers a planner
//! computes, cancels them when an entry goes away, and decides on every
//! firing whether a notification is actually surfaced.
//!
//! Per (entry, weekday, phase) the timer moves through
//! `uninstalled -> installed -> fired -> (installed again next week |
//! cancelled)`; `cancelled` is terminal and reached only through an
//! explicit cancel or entry deletion.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::entry::ScheduleEntry;
use crate::error::{CoreError, Result, TimerError};
use crate::planner::{Phase, TriggerPlanner};
use crate::services::{EntryStore, EventLog, Notifier, TimerService};

/// Identity of one external repeating timer.
///
/// The request code derivation is deterministic so that re-deriving the
/// key for cancellation always matches the code used at install time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerKey {
    pub entry_id: i64,
    #[serde(with = "weekday_num")]
    pub weekday: Weekday,
    pub phase: Phase,
}

impl TimerKey {
    pub fn new(entry_id: i64, weekday: Weekday, phase: Phase) -> Self {
        Self {
            entry_id,
            weekday,
            phase,
        }
    }

    /// Stable, collision-free request code: 14 slots per entry, two per
    /// weekday.
    pub fn code(&self) -> i64 {
        self.entry_id * 14 + self.weekday.num_days_from_sunday() as i64 * 2 + self.phase.index() as i64
    }
}

mod weekday_num {
    use chrono::Weekday;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(day.num_days_from_sunday() as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Weekday::Sun),
            1 => Ok(Weekday::Mon),
            2 => Ok(Weekday::Tue),
            3 => Ok(Weekday::Wed),
            4 => Ok(Weekday::Thu),
            5 => Ok(Weekday::Fri),
            6 => Ok(Weekday::Sat),
            n => Err(D::Error::custom(format!("weekday index {n} out of range"))),
        }
    }
}

/// What `on_fire` decided to do with a delivered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// A notification was surfaced for this phase.
    Notified(Phase),
    /// Escalation delivered on a different weekday than it was tagged for
    /// (clock or timer-service drift); discarded.
    WrongDay,
    /// The entry no longer exists; a cancel/fire race, discarded.
    EntryGone,
    /// The dose was already acknowledged today; escalation suppressed.
    AlreadyTaken,
}

/// Owns timer installation, cancellation, and the fire-time decision.
pub struct AlarmOrchestrator {
    planner: TriggerPlanner,
    store: Arc<dyn EntryStore>,
    timers: Arc<dyn TimerService>,
    notifier: Arc<dyn Notifier>,
    log: Arc<dyn EventLog>,
}

impl AlarmOrchestrator {
    pub fn new(
        planner: TriggerPlanner,
        store: Arc<dyn EntryStore>,
        timers: Arc<dyn TimerService>,
        notifier: Arc<dyn Notifier>,
        log: Arc<dyn EventLog>,
    ) -> Self {
        Self {
            planner,
            store,
            timers,
            notifier,
            log,
        }
    }

    /// Arm one weekly-repeating timer per planned trigger instant.
    ///
    /// The repeat period is a fixed seven days from the first instant, so
    /// correctness depends on the planner anchoring that instant to the
    /// right weekday. Installation is atomic: if the timer service fails
    /// partway, every timer armed so far is cancelled again and the error
    /// is surfaced, so no entry is left with a partial timer set.
    pub fn install(&self, entry: &ScheduleEntry, now: NaiveDateTime) -> Result<()> {
        let mut armed: Vec<i64> = Vec::new();
        for trigger in self.planner.plan(entry, now) {
            let key = TimerKey::new(trigger.entry_id, trigger.weekday, trigger.phase);
            if let Err(err) =
                self.timers
                    .schedule_repeating(key.code(), trigger.at, Duration::weeks(1), key)
            {
                for code in armed {
                    let _ = self.timers.cancel(code);
                }
                return Err(CoreError::Timer(err));
            }
            armed.push(key.code());
        }
        Ok(())
    }

    /// Cancel every timer for the entry, both phases on all active
    /// weekdays. Safe to call for entries with nothing installed.
    pub fn cancel(&self, entry: &ScheduleEntry) -> Result<(), TimerError> {
        for weekday in entry.days.iter() {
            self.cancel_day(entry.id, weekday)?;
        }
        Ok(())
    }

    /// Cancel both phases for one weekday.
    pub fn cancel_day(&self, entry_id: i64, weekday: Weekday) -> Result<(), TimerError> {
        for phase in [Phase::Reminder, Phase::Escalation] {
            self.timers
                .cancel(TimerKey::new(entry_id, weekday, phase).code())?;
        }
        Ok(())
    }

    /// React to a timer delivered by the external dispatcher.
    ///
    /// Stale, raced, or already-acknowledged firings are discarded
    /// silently; the returned decision says which. A surfaced firing also
    /// writes the day's scheduled DoseEvent row (first write wins) so the
    /// analytics log accrues one row per active day.
    pub fn on_fire(&self, key: TimerKey, now: NaiveDateTime) -> Result<FireDecision> {
        // The weekday tag is compared against the actual weekday at fire
        // time, not install time.
        if key.phase == Phase::Escalation && key.weekday != now.weekday() {
            return Ok(FireDecision::WrongDay);
        }

        // Timers for deleted entries should already be cancelled, but a
        // firing in flight during deletion must be tolerated.
        let Some(entry) = self.store.get(key.entry_id)? else {
            return Ok(FireDecision::EntryGone);
        };

        if key.phase == Phase::Escalation && entry.consumed_today {
            return Ok(FireDecision::AlreadyTaken);
        }

        let log_result = self.log.append_or_update_scheduled(&entry, now.date());

        match key.phase {
            Phase::Reminder => {
                self.notifier
                    .notify_reminder(&entry.name, entry.dose.as_str(), entry.id)
            }
            Phase::Escalation => {
                self.notifier
                    .notify_escalation(&entry.name, entry.dose.as_str(), entry.id)
            }
        }

        // The notification is not held hostage to the analytics write; the
        // error still surfaces to the dispatcher afterwards.
        log_result?;
        Ok(FireDecision::Notified(key.phase))
    }

    /// Deliver a batch of fired timers.
    ///
    /// Every key is dispatched even when an earlier one fails; the first
    /// error is returned after the sweep. Timers already rearmed by the
    /// dispatcher would otherwise lose their delivery for a whole period.
    pub fn dispatch(
        &self,
        keys: impl IntoIterator<Item = TimerKey>,
        now: NaiveDateTime,
    ) -> Result<Vec<FireDecision>> {
        let mut decisions = Vec::new();
        let mut deferred: Option<CoreError> = None;
        for key in keys {
            match self.on_fire(key, now) {
                Ok(decision) => decisions.push(decision),
                Err(err) => {
                    deferred.get_or_insert(err);
                }
            }
        }
        match deferred {
            Some(err) => Err(err),
            None => Ok(decisions),
        }
    }
}
