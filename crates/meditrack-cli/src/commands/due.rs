use chrono::Local;

use crate::app::App;

/// Catch up the daily reset, then deliver every timer whose fire instant
/// has passed. Each delivery runs through the orchestrator, which
/// discards stale or already-acknowledged firings.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let now = Local::now().naive_local();

    app.reset.catch_up(now.date())?;

    let due = app.timers.due(now)?;
    if due.is_empty() {
        println!("nothing due");
        return Ok(());
    }
    // The drained timers are already rearmed a period out; dispatch keeps
    // delivering past a failure so none of them lose their slot.
    app.orchestrator.dispatch(due, now)?;
    Ok(())
}

/// Clear every consumed-today flag regardless of the last reset date.
pub fn run_reset() -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let today = Local::now().naive_local().date();
    app.reset.reset_all(today)?;
    println!("consumed flags cleared");
    Ok(())
}
