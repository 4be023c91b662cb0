//! Adherence analytics.
//!
//! Read-only aggregation over the DoseEvent log and the deleted-entry
//! archive: dose-weighted strike rate, dosing delay, per-medicine
//! history, and weekly trend buckets.

mod adherence;

pub use adherence::{
    dose_weight, AdherenceAnalyzer, AnalyticsSummary, MedicineHistory, WeeklyAdherence,
    DEFAULT_TREND_WEEKS,
};
