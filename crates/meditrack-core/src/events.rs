//! Analytics log records.
//!
//! Every day a medication is active produces at most one [`DoseEvent`]:
//! the scheduled half is written once (first write wins) when a reminder
//! surfaces, the taken half is an update applied on acknowledgment.
//! Deleting an entry folds its accumulated rows into a
//! [`DeletedEntrySummary`] so analytics survive the deletion.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::entry::WeekdaySet;

/// One analytics log row per (entry id, calendar date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseEvent {
    pub entry_id: i64,
    pub name: String,
    /// Dose text as it was at logging time; the live entry may change later.
    pub dose: String,
    pub scheduled: NaiveTime,
    /// Wall-clock time the dose was acknowledged, if it was.
    pub actual: Option<NaiveTime>,
    pub taken: bool,
    /// Set when the owning entry is deleted; the row survives for history.
    pub deleted: bool,
    pub date: NaiveDate,
}

/// Snapshot written when an entry is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedEntrySummary {
    pub name: String,
    pub dose: String,
    pub time: NaiveTime,
    pub days: WeekdaySet,
    pub deleted_on: NaiveDate,
    /// DoseEvent rows accumulated up to deletion.
    pub total_doses: u32,
    pub taken_doses: u32,
}
