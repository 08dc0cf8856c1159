//! Usage export read from a JSON file.
//!
//! The file is an array of usage samples:
//!
//! ```json
//! [{"package_id": "com.x", "last_foreground": "2026-03-10T12:00:00Z", "foreground_duration_ms": 3660000}]
//! ```
//!
//! A day window sees the samples whose `last_foreground` falls inside it.

use std::future::Future;
use std::path::Path;

use touchgrass_core::{DayWindow, UsageError, UsageSample, UsageSource};

pub struct SampleFile {
    samples: Vec<UsageSample>,
}

impl SampleFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let samples: Vec<UsageSample> = serde_json::from_str(&content)
            .map_err(|e| format!("invalid samples in {}: {e}", path.display()))?;
        tracing::debug!(count = samples.len(), path = %path.display(), "loaded usage samples");
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[UsageSample] {
        &self.samples
    }
}

impl UsageSource for SampleFile {
    fn query_usage(
        &self,
        window: DayWindow,
    ) -> impl Future<Output = Result<Vec<UsageSample>, UsageError>> + Send {
        let samples = self
            .samples
            .iter()
            .filter(|s| window.contains(s.last_foreground))
            .cloned()
            .collect();
        async move { Ok(samples) }
    }
}

/// Single-threaded runtime for the async report APIs.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}
