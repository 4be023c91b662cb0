use clap::{Parser, Subcommand};

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "meditrack-cli", version, about = "MediTrack CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Medicine schedule management
    Medicine {
        #[command(subcommand)]
        action: commands::medicine::MedicineAction,
    },
    /// Adherence statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Deliver due reminders and escalations
    Due,
    /// Clear every consumed-today flag
    Reset,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Medicine { action } => commands::medicine::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Due => commands::due::run(),
        Commands::Reset => commands::due::run_reset(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
