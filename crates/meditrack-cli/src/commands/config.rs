use clap::Subcommand;
use meditrack_core::storage::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of: notifications.enabled, reminder_lead_min,
        /// escalation_delay_min, trend_weeks
        key: String,
        value: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default();
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_or_default();
            match key.as_str() {
                "notifications.enabled" => config.notifications.enabled = value.parse()?,
                "reminder_lead_min" => config.reminder_lead_min = value.parse()?,
                "escalation_delay_min" => config.escalation_delay_min = value.parse()?,
                "trend_weeks" => config.trend_weeks = value.parse()?,
                other => return Err(format!("unknown config key '{other}'").into()),
            }
            config.save()?;
            println!("{key} updated");
        }
    }
    Ok(())
}
