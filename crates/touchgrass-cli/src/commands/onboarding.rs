use clap::Subcommand;
use serde::Serialize;
use touchgrass_core::{Config, OnboardingFlag};

use super::{open_db, print_json, CliResult};

#[derive(Subcommand)]
pub enum OnboardingAction {
    /// Show whether onboarding is done and where the app starts
    Status,
    /// Mark onboarding as completed
    Complete,
}

#[derive(Serialize)]
struct Status {
    completed: bool,
    initial_route: String,
}

pub fn run(action: OnboardingAction) -> CliResult {
    let db = open_db()?;

    match action {
        OnboardingAction::Status => {
            let home_route = Config::load_or_default().watcher.home_route;
            print_json(&Status {
                completed: OnboardingFlag::is_completed(&db)?,
                initial_route: OnboardingFlag::initial_route(&db, &home_route)?,
            })?;
        }
        OnboardingAction::Complete => {
            OnboardingFlag::mark_completed(&db)?;
            println!("ok");
        }
    }
    Ok(())
}
