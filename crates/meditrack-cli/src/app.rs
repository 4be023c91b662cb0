//! Wiring of the core components against the SQLite storage and a
//! terminal notifier.

use std::error::Error;
use std::sync::{Arc, Mutex};

use meditrack_core::acknowledge::AckHandler;
use meditrack_core::manager::ScheduleManager;
use meditrack_core::orchestrator::AlarmOrchestrator;
use meditrack_core::planner::TriggerPlanner;
use meditrack_core::reset::DailyResetCoordinator;
use meditrack_core::services::Notifier;
use meditrack_core::stats::AdherenceAnalyzer;
use meditrack_core::storage::{Config, SqliteStore, SqliteTimerService};

/// Prints notifications to the terminal. Only the reminder rings the
/// bell; the escalation is silent.
pub struct TerminalNotifier {
    enabled: bool,
}

impl TerminalNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for TerminalNotifier {
    fn notify_reminder(&self, name: &str, dose: &str, _entry_id: i64) {
        if self.enabled {
            println!("\x07[reminder] Time to take your medicine: {dose} of {name}");
        }
    }

    fn notify_escalation(&self, name: &str, dose: &str, _entry_id: i64) {
        if self.enabled {
            println!("[follow-up] Did you take {name} ({dose})?");
        }
    }

    fn notify_confirmation(&self, message: &str) {
        if self.enabled {
            println!("[taken] {message}");
        }
    }
}

/// Everything a command needs, built from the shared database file.
pub struct App {
    pub store: Arc<SqliteStore>,
    pub timers: Arc<SqliteTimerService>,
    pub orchestrator: Arc<AlarmOrchestrator>,
    pub manager: ScheduleManager,
    pub ack: AckHandler,
    pub reset: DailyResetCoordinator,
    pub analyzer: AdherenceAnalyzer,
}

impl App {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let config = Config::load_or_default();
        let store = Arc::new(SqliteStore::open()?);
        let timers = Arc::new(SqliteTimerService::open()?);
        let notifier = Arc::new(TerminalNotifier::new(config.notifications.enabled));

        let planner =
            TriggerPlanner::with_offsets(config.reminder_lead_min, config.escalation_delay_min);
        let orchestrator = Arc::new(AlarmOrchestrator::new(
            planner,
            store.clone(),
            timers.clone(),
            notifier.clone(),
            store.clone(),
        ));

        let state_lock = Arc::new(Mutex::new(()));
        let manager = ScheduleManager::new(store.clone(), store.clone(), orchestrator.clone());
        let ack = AckHandler::new(
            store.clone(),
            store.clone(),
            notifier,
            state_lock.clone(),
        );
        let reset = DailyResetCoordinator::new(store.clone(), store.clone(), state_lock);
        let analyzer = AdherenceAnalyzer::with_trend_weeks(config.trend_weeks);

        Ok(Self {
            store,
            timers,
            orchestrator,
            manager,
            ack,
            reset,
            analyzer,
        })
    }
}
