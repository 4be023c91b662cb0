//! Adherence analytics aggregation.
//!
//! The aggregator is pure: it consumes slices of [`DoseEvent`] and
//! [`DeletedEntrySummary`] rows and computes the summary in one pass
//! per metric. Rows whose owning entry was deleted are excluded from the
//! rate metrics but kept in the per-medicine history through their
//! archived summaries. Every output is well-defined on an empty log.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::events::{DeletedEntrySummary, DoseEvent};

/// Numeric weight of a dose string.
///
/// Fractional strengths parse to their fractional value, whole numbers to
/// themselves. Unknown strings weigh 1.0; the dose vocabulary is fixed at
/// entry creation, so anything else is legacy data.
pub fn dose_weight(dose: &str) -> f64 {
    match dose {
        "1/4" => 0.25,
        "1/2" => 0.5,
        other => other.parse::<f64>().unwrap_or(1.0),
    }
}

/// Total and taken dose counts for one medicine name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineHistory {
    pub name: String,
    pub total_doses: u32,
    pub taken_doses: u32,
    /// Whether this row comes from the deleted-entry archive.
    pub deleted: bool,
}

/// Scheduled vs taken counts for one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAdherence {
    pub year: i32,
    pub week: u32,
    pub scheduled_doses: u32,
    pub taken_doses: u32,
}

impl WeeklyAdherence {
    pub fn label(&self) -> String {
        format!("Week {}-{:02}", self.year, self.week)
    }
}

/// Full analytics output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    /// Dose-weighted percentage of scheduled doses actually taken, 0-100.
    pub strike_rate: f64,
    /// Average distinct medicines scheduled per day with any activity.
    pub avg_entries_per_day: f64,
    /// Average lateness in minutes over late doses only.
    pub avg_delay_min: f64,
    pub active_medicines: usize,
    pub deleted_medicines: usize,
    pub total_medicines_tracked: usize,
    pub history: Vec<MedicineHistory>,
    /// Most recent weeks first.
    pub weekly_trend: Vec<WeeklyAdherence>,
}

/// Default number of weekly trend buckets reported.
pub const DEFAULT_TREND_WEEKS: usize = 8;

/// Pure aggregator over the analytics log.
#[derive(Debug, Clone, Copy)]
pub struct AdherenceAnalyzer {
    trend_weeks: usize,
}

impl Default for AdherenceAnalyzer {
    fn default() -> Self {
        Self {
            trend_weeks: DEFAULT_TREND_WEEKS,
        }
    }
}

impl AdherenceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trend_weeks(trend_weeks: usize) -> Self {
        Self { trend_weeks }
    }

    /// Compute the full summary.
    ///
    /// `active_medicines` is the current live entry count from the store;
    /// the log alone cannot know about entries that never fired.
    pub fn analyze(
        &self,
        events: &[DoseEvent],
        summaries: &[DeletedEntrySummary],
        active_medicines: usize,
    ) -> AnalyticsSummary {
        let live: Vec<&DoseEvent> = events.iter().filter(|e| !e.deleted).collect();

        AnalyticsSummary {
            strike_rate: strike_rate(&live),
            avg_entries_per_day: avg_entries_per_day(&live),
            avg_delay_min: avg_delay_min(&live),
            active_medicines,
            deleted_medicines: summaries.len(),
            total_medicines_tracked: active_medicines + summaries.len(),
            history: history(&live, summaries),
            weekly_trend: weekly_trend(&live, self.trend_weeks),
        }
    }
}

fn strike_rate(events: &[&DoseEvent]) -> f64 {
    let mut scheduled = 0.0;
    let mut taken = 0.0;
    for event in events {
        let weight = dose_weight(&event.dose);
        scheduled += weight;
        if event.taken {
            taken += weight;
        }
    }
    if scheduled > 0.0 {
        taken / scheduled * 100.0
    } else {
        0.0
    }
}

fn avg_entries_per_day(events: &[&DoseEvent]) -> f64 {
    let mut per_day: HashMap<NaiveDate, HashSet<i64>> = HashMap::new();
    for event in events {
        per_day.entry(event.date).or_default().insert(event.entry_id);
    }
    if per_day.is_empty() {
        return 0.0;
    }
    let total: usize = per_day.values().map(HashSet::len).sum();
    total as f64 / per_day.len() as f64
}

const HALF_DAY_MIN: i64 = 12 * 60;
const FULL_DAY_MIN: i64 = 24 * 60;

fn avg_delay_min(events: &[&DoseEvent]) -> f64 {
    let mut total = 0i64;
    let mut count = 0u32;
    for event in events.iter().filter(|e| e.taken) {
        let Some(actual) = event.actual else { continue };
        let mut delta = (actual - event.scheduled).num_minutes();
        // A dose scheduled near midnight and taken after it rolls into the
        // next calendar day; anything more than 12 hours "early" is that
        // wraparound, not an early dose.
        if delta < -HALF_DAY_MIN {
            delta += FULL_DAY_MIN;
        }
        if delta > 0 {
            total += delta;
            count += 1;
        }
    }
    if count > 0 {
        total as f64 / count as f64
    } else {
        0.0
    }
}

fn history(events: &[&DoseEvent], summaries: &[DeletedEntrySummary]) -> Vec<MedicineHistory> {
    let mut by_name: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for event in events {
        let counts = by_name.entry(event.name.clone()).or_default();
        counts.0 += 1;
        if event.taken {
            counts.1 += 1;
        }
    }
    let mut history: Vec<MedicineHistory> = by_name
        .into_iter()
        .map(|(name, (total, taken))| MedicineHistory {
            name,
            total_doses: total,
            taken_doses: taken,
            deleted: false,
        })
        .collect();
    history.extend(summaries.iter().map(|s| MedicineHistory {
        name: s.name.clone(),
        total_doses: s.total_doses,
        taken_doses: s.taken_doses,
        deleted: true,
    }));
    history
}

fn weekly_trend(events: &[&DoseEvent], trend_weeks: usize) -> Vec<WeeklyAdherence> {
    let mut buckets: BTreeMap<(i32, u32), (u32, u32)> = BTreeMap::new();
    for event in events {
        let week = event.date.iso_week();
        let counts = buckets.entry((week.year(), week.week())).or_default();
        counts.0 += 1;
        if event.taken {
            counts.1 += 1;
        }
    }
    buckets
        .into_iter()
        .rev()
        .take(trend_weeks)
        .map(|((year, week), (scheduled, taken))| WeeklyAdherence {
            year,
            week,
            scheduled_doses: scheduled,
            taken_doses: taken,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn event(
        entry_id: i64,
        name: &str,
        dose: &str,
        date: NaiveDate,
        scheduled: NaiveTime,
        actual: Option<NaiveTime>,
    ) -> DoseEvent {
        DoseEvent {
            entry_id,
            name: name.into(),
            dose: dose.into(),
            scheduled,
            actual,
            taken: actual.is_some(),
            deleted: false,
            date,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn dose_weights() {
        assert_eq!(dose_weight("1/4"), 0.25);
        assert_eq!(dose_weight("1/2"), 0.5);
        assert_eq!(dose_weight("3"), 3.0);
        assert_eq!(dose_weight("mystery"), 1.0);
    }

    #[test]
    fn empty_log_is_all_zeros() {
        let summary = AdherenceAnalyzer::new().analyze(&[], &[], 0);
        assert_eq!(summary.strike_rate, 0.0);
        assert_eq!(summary.avg_entries_per_day, 0.0);
        assert_eq!(summary.avg_delay_min, 0.0);
        assert_eq!(summary.total_medicines_tracked, 0);
        assert!(summary.history.is_empty());
        assert!(summary.weekly_trend.is_empty());
    }

    #[test]
    fn strike_rate_is_dose_weighted() {
        // "1/2" taken, "1" not taken: 100 * 0.5 / 1.5.
        let events = vec![
            event(1, "A", "1/2", date(10), time(9, 0), Some(time(9, 5))),
            event(2, "B", "1", date(10), time(9, 0), None),
        ];
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 2);
        assert!((summary.strike_rate - 100.0 * 0.5 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn deleted_rows_do_not_count_toward_rates() {
        let mut gone = event(3, "C", "1", date(10), time(9, 0), None);
        gone.deleted = true;
        let events = vec![
            event(1, "A", "1", date(10), time(9, 0), Some(time(9, 0))),
            gone,
        ];
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 1);
        assert_eq!(summary.strike_rate, 100.0);
    }

    #[test]
    fn avg_entries_per_day_counts_distinct_ids() {
        let events = vec![
            event(1, "A", "1", date(10), time(9, 0), None),
            event(2, "B", "1", date(10), time(12, 0), None),
            event(1, "A", "1", date(11), time(9, 0), None),
        ];
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 2);
        assert!((summary.avg_entries_per_day - 1.5).abs() < 1e-9);
    }

    #[test]
    fn only_late_doses_contribute_to_delay() {
        let events = vec![
            // 45 minutes late.
            event(1, "A", "1", date(10), time(9, 0), Some(time(9, 45))),
            // 15 minutes early: ignored.
            event(1, "A", "1", date(11), time(9, 0), Some(time(8, 45))),
            // Exactly on time: ignored.
            event(1, "A", "1", date(12), time(9, 0), Some(time(9, 0))),
        ];
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 1);
        assert!((summary.avg_delay_min - 45.0).abs() < 1e-9);
    }

    #[test]
    fn delay_wraps_around_midnight() {
        // Scheduled 23:30, taken 00:15 the next day: raw delta -1395,
        // corrected to +45.
        let events = vec![event(1, "A", "1", date(10), time(23, 30), Some(time(0, 15)))];
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 1);
        assert!((summary.avg_delay_min - 45.0).abs() < 1e-9);
    }

    #[test]
    fn history_spans_live_and_deleted_medicines() {
        let events = vec![
            event(1, "Aspirin", "1", date(10), time(9, 0), Some(time(9, 5))),
            event(1, "Aspirin", "1", date(11), time(9, 0), None),
        ];
        let summaries = vec![DeletedEntrySummary {
            name: "Ibuprofen".into(),
            dose: "1/2".into(),
            time: time(20, 0),
            days: crate::entry::WeekdaySet::every_day(),
            deleted_on: date(9),
            total_doses: 10,
            taken_doses: 7,
        }];
        let summary = AdherenceAnalyzer::new().analyze(&events, &summaries, 1);

        assert_eq!(summary.history.len(), 2);
        let aspirin = summary.history.iter().find(|h| h.name == "Aspirin").unwrap();
        assert_eq!((aspirin.total_doses, aspirin.taken_doses), (2, 1));
        assert!(!aspirin.deleted);
        let ibuprofen = summary.history.iter().find(|h| h.name == "Ibuprofen").unwrap();
        assert_eq!((ibuprofen.total_doses, ibuprofen.taken_doses), (10, 7));
        assert!(ibuprofen.deleted);
        assert_eq!(summary.deleted_medicines, 1);
        assert_eq!(summary.total_medicines_tracked, 2);
    }

    #[test]
    fn weekly_trend_keeps_most_recent_buckets() {
        // Ten consecutive Mondays: ten ISO weeks, trimmed to eight.
        let mut events = Vec::new();
        for i in 0..10u32 {
            let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                + chrono::Duration::weeks(i as i64);
            events.push(event(1, "A", "1", day, time(9, 0), (i % 2 == 0).then(|| time(9, 5))));
        }
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 1);

        assert_eq!(summary.weekly_trend.len(), 8);
        // Most recent first.
        assert!(summary.weekly_trend[0].week > summary.weekly_trend[7].week);
        assert!(summary
            .weekly_trend
            .iter()
            .all(|w| w.scheduled_doses == 1));
    }

    #[test]
    fn trend_bucket_counts_scheduled_and_taken() {
        let events = vec![
            event(1, "A", "1", date(8), time(9, 0), Some(time(9, 5))),
            event(2, "B", "1", date(9), time(9, 0), None),
            event(1, "A", "1", date(10), time(9, 0), Some(time(9, 0))),
        ];
        let summary = AdherenceAnalyzer::new().analyze(&events, &[], 2);

        assert_eq!(summary.weekly_trend.len(), 1);
        assert_eq!(summary.weekly_trend[0].scheduled_doses, 3);
        assert_eq!(summary.weekly_trend[0].taken_doses, 2);
        assert_eq!(summary.weekly_trend[0].label(), "Week 2024-02");
    }
}
