pub mod config;
pub mod evaluate;
pub mod gate;
pub mod onboarding;
pub mod quota;
pub mod stats;
pub mod streak;

use touchgrass_core::Database;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn open_db() -> Result<Database, Box<dyn std::error::Error>> {
    Ok(Database::open()?)
}
