use clap::Subcommand;
use chrono::{Local, NaiveTime};
use meditrack_core::entry::{Dose, NewEntry, WeekdaySet};

use crate::app::App;

#[derive(Subcommand)]
pub enum MedicineAction {
    /// Add a medicine and arm its weekly reminders
    Add {
        /// Medicine name
        name: String,
        /// Dose in tablets: 1/4, 1/2, or 1 through 6
        dose: String,
        /// Dose time, e.g. 09:30
        time: String,
        /// Comma-separated weekdays, e.g. Monday,Wednesday,Friday
        days: String,
    },
    /// List all medicines
    List,
    /// Medicines scheduled for today
    Today,
    /// Edit a medicine's fields and reinstall its reminders
    Edit {
        id: i64,
        name: String,
        dose: String,
        time: String,
        days: String,
    },
    /// Mark today's dose as taken
    Taken { id: i64 },
    /// Delete a medicine, archiving its adherence history
    Delete { id: i64 },
}

fn parse_new_entry(
    name: String,
    dose: &str,
    time: &str,
    days: &str,
) -> Result<NewEntry, Box<dyn std::error::Error>> {
    let dose: Dose = dose.parse()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")?;
    let days: WeekdaySet = days.parse()?;
    Ok(NewEntry {
        name,
        dose,
        time,
        days,
    })
}

pub fn run(action: MedicineAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let now = Local::now().naive_local();

    match action {
        MedicineAction::Add {
            name,
            dose,
            time,
            days,
        } => {
            let entry = parse_new_entry(name, &dose, &time, &days)?;
            let created = app.manager.create(&entry, now)?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        MedicineAction::List => {
            let entries = app.manager.list()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        MedicineAction::Today => {
            let entries = app.manager.due_today(now)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        MedicineAction::Edit {
            id,
            name,
            dose,
            time,
            days,
        } => {
            let entry = parse_new_entry(name, &dose, &time, &days)?;
            let updated = app.manager.update(id, &entry, now)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        MedicineAction::Taken { id } => {
            app.ack.acknowledge(id, now)?;
        }
        MedicineAction::Delete { id } => {
            let summary = app.manager.delete(id, now)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
