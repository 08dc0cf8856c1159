use clap::Subcommand;
use serde::Serialize;
use touchgrass_core::{Config, QuotaMap, QuotaStore};

use super::{open_db, print_json, CliResult};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// List target apps and their quotas in minutes
    List,
    /// Start tracking an app with the default quota
    Target {
        /// Package id (e.g. "com.instagram.android")
        package: String,
    },
    /// Set an app's daily quota
    Set {
        package: String,
        /// Minutes per day, must be > 0
        minutes: u32,
    },
    /// Stop tracking an app
    Untarget { package: String },
    /// Remove every target
    Clear,
}

#[derive(Serialize)]
struct QuotaEntry<'a> {
    package_id: &'a str,
    quota_minutes: u32,
}

fn print_quotas(quotas: &QuotaMap) -> CliResult {
    let entries: Vec<QuotaEntry> = quotas
        .iter()
        .map(|(package_id, quota_minutes)| QuotaEntry {
            package_id,
            quota_minutes,
        })
        .collect();
    print_json(&entries)
}

pub fn run(action: QuotaAction) -> CliResult {
    let db = open_db()?;
    let store = QuotaStore::new(&db);

    match action {
        QuotaAction::List => print_quotas(&store.load()?)?,
        QuotaAction::Target { package } => {
            let default_minutes = Config::load_or_default().quota.default_quota_minutes;
            print_quotas(&store.target(&package, default_minutes)?)?;
        }
        QuotaAction::Set { package, minutes } => {
            print_quotas(&store.set_quota(&package, minutes)?)?;
        }
        QuotaAction::Untarget { package } => {
            print_quotas(&store.untarget(&package)?)?;
        }
        QuotaAction::Clear => {
            store.clear()?;
            println!("all targets removed");
        }
    }
    Ok(())
}
