//! Trigger planning.
//!
//! Maps a schedule entry to the concrete set of future trigger instants:
//! for every active weekday, a reminder 30 minutes before the scheduled
//! time and an escalation 30 minutes after. The planner is a pure
//! function over (entry, now) with no side effects; the orchestrator
//! turns its output into weekly-repeating timers.

use chrono::{Datelike, Duration, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::entry::ScheduleEntry;

/// Alarm phase for one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// 30 minutes before the scheduled dose time. Audible.
    Reminder,
    /// 30 minutes after. Visual-only, suppressed once acknowledged.
    Escalation,
}

impl Phase {
    pub fn index(&self) -> u8 {
        match self {
            Phase::Reminder => 0,
            Phase::Escalation => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Phase> {
        match index {
            0 => Some(Phase::Reminder),
            1 => Some(Phase::Escalation),
            _ => None,
        }
    }

    /// Only the reminder phase carries an audible alert.
    pub fn is_audible(&self) -> bool {
        matches!(self, Phase::Reminder)
    }
}

/// One computed trigger: derived from the entry, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerInstant {
    pub entry_id: i64,
    pub weekday: Weekday,
    pub phase: Phase,
    pub at: NaiveDateTime,
}

/// Default minutes between the reminder and the scheduled dose time.
pub const DEFAULT_LEAD_MIN: i64 = 30;
/// Default minutes between the scheduled dose time and the escalation.
pub const DEFAULT_FOLLOW_UP_MIN: i64 = 30;

/// Pure planner from schedule entries to trigger instants.
#[derive(Debug, Clone, Copy)]
pub struct TriggerPlanner {
    lead_min: i64,
    follow_up_min: i64,
}

impl Default for TriggerPlanner {
    fn default() -> Self {
        Self {
            lead_min: DEFAULT_LEAD_MIN,
            follow_up_min: DEFAULT_FOLLOW_UP_MIN,
        }
    }
}

impl TriggerPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Planner with custom phase offsets (both in minutes).
    pub fn with_offsets(lead_min: i64, follow_up_min: i64) -> Self {
        Self {
            lead_min,
            follow_up_min,
        }
    }

    /// Compute all trigger instants for `entry`, anchored to the next
    /// future occurrence of each active weekday.
    ///
    /// Produces exactly `2 x |days|` instants, each strictly after `now`.
    /// An instant that already passed this week (<= now) advances by
    /// exactly one week. The weekday tag keeps the entry's scheduled
    /// weekday even when the reminder offset crosses midnight backwards.
    ///
    /// Input contract: `entry.days` is non-empty; enforcement lives at the
    /// entry-creation boundary.
    pub fn plan(&self, entry: &ScheduleEntry, now: NaiveDateTime) -> Vec<TriggerInstant> {
        let mut instants = Vec::with_capacity(entry.days.len() * 2);
        for weekday in entry.days.iter() {
            for (phase, offset_min) in [
                (Phase::Reminder, -self.lead_min),
                (Phase::Escalation, self.follow_up_min),
            ] {
                let days_ahead = (weekday.num_days_from_sunday() as i64
                    - now.weekday().num_days_from_sunday() as i64)
                    .rem_euclid(7);
                let scheduled = (now.date() + Duration::days(days_ahead)).and_time(entry.time);
                let mut at = scheduled + Duration::minutes(offset_min);
                if at <= now {
                    at += Duration::weeks(1);
                }
                instants.push(TriggerInstant {
                    entry_id: entry.id,
                    weekday,
                    phase,
                    at,
                });
            }
        }
        instants
    }
}
