mod evaluator;
mod watch;

pub use evaluator::{breakdown, tracked_total, weekly_totals, Evaluation, QuotaEvaluator};
pub use watch::{ViolationWatch, WatchState};
