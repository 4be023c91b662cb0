use clap::Subcommand;
use meditrack_core::services::EventLog;

use crate::app::App;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Full adherence summary
    Summary,
    /// Per-medicine history, live and deleted
    History,
    /// Weekly adherence trend
    Weekly,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let events = app.store.events()?;
    let summaries = app.store.summaries()?;
    let active = app.manager.list()?.len();
    let summary = app.analyzer.analyze(&events, &summaries, active);

    match action {
        StatsAction::Summary => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::History => {
            println!("{}", serde_json::to_string_pretty(&summary.history)?);
        }
        StatsAction::Weekly => {
            println!("{}", serde_json::to_string_pretty(&summary.weekly_trend)?);
        }
    }
    Ok(())
}
