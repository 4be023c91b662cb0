//! Daily reset of the consumed-today flags.
//!
//! An external once-per-day timer anchored to local midnight invokes
//! [`DailyResetCoordinator::reset_all`]; process start calls
//! [`DailyResetCoordinator::catch_up`] to cover firings missed across
//! sleep or reboot, using the persisted last-reset date. The reset never
//! touches DoseEvent history.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::Result;
use crate::services::{EntryStore, KvStore};

/// Key under which the last completed reset date is persisted.
pub const LAST_RESET_KEY: &str = "last_reset_date";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct DailyResetCoordinator {
    store: Arc<dyn EntryStore>,
    kv: Arc<dyn KvStore>,
    /// Shared with the acknowledgment handler so a reset never
    /// interleaves with an in-flight acknowledgment.
    state_lock: Arc<Mutex<()>>,
}

impl DailyResetCoordinator {
    pub fn new(
        store: Arc<dyn EntryStore>,
        kv: Arc<dyn KvStore>,
        state_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            kv,
            state_lock,
        }
    }

    /// Clear consumed-today for every entry and stamp `today` as done.
    /// Safe to call any number of times per day.
    pub fn reset_all(&self, today: NaiveDate) -> Result<()> {
        let _guard = self.state_lock.lock().unwrap_or_else(|e| e.into_inner());
        for entry in self.store.list()? {
            if entry.consumed_today {
                self.store.update_consumed(entry.id, false)?;
            }
        }
        self.kv
            .set(LAST_RESET_KEY, &today.format(DATE_FORMAT).to_string())
    }

    /// Run the reset if the stored last-reset date differs from `today`.
    /// Returns whether a reset actually ran.
    pub fn catch_up(&self, today: NaiveDate) -> Result<bool> {
        let stamp = today.format(DATE_FORMAT).to_string();
        if self.kv.get(LAST_RESET_KEY)?.as_deref() == Some(stamp.as_str()) {
            return Ok(false);
        }
        self.reset_all(today)?;
        Ok(true)
    }
}
