use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use touchgrass_core::{Config, Evaluation, QuotaEvaluator, QuotaStore};

use super::{open_db, print_json, CliResult};
use crate::samples::SampleFile;

#[derive(Args)]
pub struct EvaluateArgs {
    /// JSON file with the usage samples of one window
    #[arg(long)]
    samples: PathBuf,
    /// Treat the configured host package like any other app
    #[arg(long)]
    include_host: bool,
}

#[derive(Serialize)]
struct EvaluateOutput {
    #[serde(flatten)]
    evaluation: Evaluation,
    quota_minutes: u32,
}

pub fn run(args: EvaluateArgs) -> CliResult {
    let samples = SampleFile::load(&args.samples)?;
    let quotas = QuotaStore::new(&open_db()?).load()?;

    let evaluator = if args.include_host {
        QuotaEvaluator::new()
    } else {
        QuotaEvaluator::for_host(Config::load_or_default().watcher.host_package)
    };
    let evaluation = evaluator.evaluate(samples.samples(), &quotas);
    let quota_minutes = evaluation
        .top_package_id
        .as_deref()
        .map(|pkg| quotas.quota_minutes(pkg))
        .unwrap_or(0);

    print_json(&EvaluateOutput {
        evaluation,
        quota_minutes,
    })
}
