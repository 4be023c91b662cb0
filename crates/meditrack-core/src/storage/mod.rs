//! SQLite-backed implementations of the collaborator traits, plus the
//! TOML application configuration.

mod config;
pub mod database;
pub mod migrations;
pub mod timers;

pub use config::Config;
pub use database::SqliteStore;
pub use timers::SqliteTimerService;

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/meditrack[-dev]/` based on MEDITRACK_ENV.
///
/// Set MEDITRACK_ENV=dev to use a separate development data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MEDITRACK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("meditrack-dev")
    } else {
        base_dir.join("meditrack")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
