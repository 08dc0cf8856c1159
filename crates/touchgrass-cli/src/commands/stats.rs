use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use touchgrass_core::usage::WEEK_DAYS;
use touchgrass_core::{DayWindow, QuotaStore, Reports};

use super::{open_db, print_json, CliResult};
use crate::samples::{block_on, SampleFile};

#[derive(Args)]
pub struct ReportArgs {
    /// JSON file with exported usage samples
    #[arg(long)]
    samples: PathBuf,
    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl ReportArgs {
    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Screen time for one day (tracked apps, or all apps when none are tracked)
    ScreenTime(ReportArgs),
    /// Minutes per tracked app for one day
    Breakdown(ReportArgs),
    /// Tracked minutes for the seven days ending on the report date
    Weekly(ReportArgs),
    /// Daily minutes of one app
    History {
        package: String,
        #[command(flatten)]
        report: ReportArgs,
        /// Number of days, ending on the report date
        #[arg(long, default_value_t = 7)]
        days: usize,
    },
}

#[derive(Serialize)]
struct ScreenTime {
    date: NaiveDate,
    minutes: f64,
}

pub fn run(action: StatsAction) -> CliResult {
    let quotas = QuotaStore::new(&open_db()?).load()?;

    match action {
        StatsAction::ScreenTime(args) => {
            let source = SampleFile::load(&args.samples)?;
            let date = args.date();
            let window = DayWindow::full_day(date, &Local);
            let minutes = block_on(Reports::new(&source).today_screen_time(window, &quotas))??;
            print_json(&ScreenTime { date, minutes })?;
        }
        StatsAction::Breakdown(args) => {
            let source = SampleFile::load(&args.samples)?;
            let window = DayWindow::full_day(args.date(), &Local);
            let breakdown = block_on(Reports::new(&source).today_breakdown(window, &quotas))??;
            print_json(&breakdown)?;
        }
        StatsAction::Weekly(args) => {
            let source = SampleFile::load(&args.samples)?;
            let days = DayWindow::trailing_days(args.date(), WEEK_DAYS, &Local);
            let totals = block_on(Reports::new(&source).weekly_totals(&days, &quotas))??;
            print_json(&totals)?;
        }
        StatsAction::History {
            package,
            report,
            days,
        } => {
            if days == 0 {
                return Err("--days must be at least 1".into());
            }
            let source = SampleFile::load(&report.samples)?;
            let windows = DayWindow::trailing_days(report.date(), days, &Local);
            let history = block_on(Reports::new(&source).app_history(&package, &windows))??;
            print_json(&history)?;
        }
    }
    Ok(())
}
