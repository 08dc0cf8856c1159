use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use touchgrass_core::storage::StreakRecord;
use touchgrass_core::{Config, Event, StreakTracker};

use super::{open_db, print_json, CliResult};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Show the stored streak
    Show,
    /// Record today's screen time and advance the streak
    CheckIn {
        /// Screen time so far today, in minutes
        #[arg(long)]
        minutes: f64,
        /// Local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Serialize)]
struct CheckInOutput {
    event: Option<Event>,
    record: StreakRecord,
}

pub fn run(action: StreakAction) -> CliResult {
    let db = open_db()?;
    let tracker = StreakTracker::new(&db, Config::load_or_default().streak);

    match action {
        StreakAction::Show => print_json(&tracker.current()?)?,
        StreakAction::CheckIn { minutes, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let event = tracker.check_in(date, minutes)?;
            print_json(&CheckInOutput {
                event,
                record: tracker.current()?,
            })?;
        }
    }
    Ok(())
}
