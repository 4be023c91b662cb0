//! # MediTrack Core Library
//!
//! This library provides the core business logic for the MediTrack
//! medication reminder. It implements a CLI-first philosophy where all
//! operations are available via a standalone CLI binary over the same
//! core library.
//!
//! ## Architecture
//!
//! - **Planner**: Pure computation of reminder/escalation trigger
//!   instants from a weekly schedule
//! - **Orchestrator**: Arms weekly repeating timers and decides on every
//!   firing whether a notification is surfaced
//! - **Storage**: SQLite-based entry, analytics-log, and timer-queue
//!   persistence plus TOML-based configuration
//! - **Stats**: Read-only adherence analytics over the dose log
//!
//! ## Key Components
//!
//! - [`ScheduleManager`]: Entry lifecycle paired with timer work
//! - [`AlarmOrchestrator`]: Timer installation and fire-time decisions
//! - [`AckHandler`]: Idempotent dose acknowledgment
//! - [`AdherenceAnalyzer`]: Analytics aggregation
//! - [`Config`]: Application configuration management

pub mod acknowledge;
pub mod entry;
pub mod error;
pub mod events;
pub mod manager;
pub mod orchestrator;
pub mod planner;
pub mod reset;
pub mod services;
pub mod stats;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use acknowledge::AckHandler;
pub use entry::{Dose, NewEntry, ScheduleEntry, WeekdaySet};
pub use error::{ConfigError, CoreError, DatabaseError, TimerError, ValidationError};
pub use events::{DeletedEntrySummary, DoseEvent};
pub use manager::ScheduleManager;
pub use orchestrator::{AlarmOrchestrator, FireDecision, TimerKey};
pub use planner::{Phase, TriggerInstant, TriggerPlanner};
pub use reset::DailyResetCoordinator;
pub use stats::{AdherenceAnalyzer, AnalyticsSummary};
pub use storage::{Config, SqliteStore, SqliteTimerService};
