use clap::{Parser, Subcommand};

mod commands;
mod samples;

#[derive(Parser)]
#[command(name = "touchgrass-cli", version, about = "Touch Grass CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Target apps and their daily quotas
    Quota {
        #[command(subcommand)]
        action: commands::quota::QuotaAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Evaluate a usage snapshot against the stored quotas
    Evaluate(commands::evaluate::EvaluateArgs),
    /// Screen-time reports from a usage export
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Daily streak
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Presence gate
    Gate {
        #[command(subcommand)]
        action: commands::gate::GateAction,
    },
    /// Onboarding state
    Onboarding {
        #[command(subcommand)]
        action: commands::onboarding::OnboardingAction,
    },
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Quota { action } => commands::quota::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Evaluate(args) => commands::evaluate::run(args),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Streak { action } => commands::streak::run(action),
        Commands::Gate { action } => commands::gate::run(action),
        Commands::Onboarding { action } => commands::onboarding::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
/// Filter from `TOUCHGRASS_LOG`, default `warn`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("TOUCHGRASS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}
