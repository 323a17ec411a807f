use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::TrialFailure;
use crate::harness::BenchConfig;
use crate::probe;
use crate::stability::StabilityVerdict;
use crate::trial::TrialRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DurationStats {
    pub min_ns: u64,
    pub median_ns: f64,
    pub mean_ns: f64,
    pub max_ns: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AllocationStats {
    pub min_bytes: u64,
    pub median_bytes: f64,
    pub mean_bytes: f64,
    /// Exact sum over completed trials.
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub name: String,
    pub warmup_count: usize,
    /// Configured number of trials.
    pub trial_count: usize,
    pub trials_completed: usize,

    pub duration: DurationStats,
    pub allocation: AllocationStats,
    /// False when no counting allocator was installed; allocation stats are 0.
    pub allocation_tracked: bool,
    pub counter_anomalies: usize,

    pub verdict: StabilityVerdict,
    /// Trials that recorded more checkpoints than the buffer holds. The
    /// verdict cannot see past the cap on those trials.
    pub checkpoints_truncated: usize,

    pub incomplete: bool,
    pub failure: Option<TrialFailure>,

    pub records: Vec<TrialRecord>,
}

/// Environment and settings shared by every report of a suite run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub crate_version: &'static str,
    /// Seconds since the Unix epoch when the run started.
    pub started_at: u64,
    /// Source revision from `STABILITY_BENCH_REVISION`, `GIT_SHA` or `GITHUB_SHA`.
    pub revision: Option<String>,
    pub config: BenchConfig,
    pub parallel: bool,
    pub allocation_tracked: bool,
}

impl RunMeta {
    pub const SCHEMA_VERSION: u32 = 2;

    pub fn capture(config: &BenchConfig, parallel: bool) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            crate_version: env!("CARGO_PKG_VERSION"),
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            revision: revision_from(|key| std::env::var(key).ok()),
            config: config.clone(),
            parallel,
            allocation_tracked: probe::counting_allocator_active(),
        }
    }
}

/// First non-empty revision variable, shortened to 12 characters.
fn revision_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ["STABILITY_BENCH_REVISION", "GIT_SHA", "GITHUB_SHA"]
        .into_iter()
        .filter_map(&lookup)
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .map(|v| v.chars().take(12).collect())
}

/// A case of a suite that produced no report.
#[derive(Debug, Clone, Serialize)]
pub struct CaseError {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run: RunMeta,
    pub reports: Vec<BenchmarkReport>,
    pub errors: Vec<CaseError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Profile;

    #[test]
    fn revision_prefers_explicit_variable_and_skips_blanks() {
        let env = |key: &str| match key {
            "STABILITY_BENCH_REVISION" => Some("  ".to_string()),
            "GIT_SHA" => Some("0123456789abcdef".to_string()),
            "GITHUB_SHA" => Some("ffffffff".to_string()),
            _ => None,
        };
        assert_eq!(revision_from(env).as_deref(), Some("0123456789ab"));
        assert_eq!(revision_from(|_| None), None);
    }

    #[test]
    fn run_meta_carries_the_run_configuration() {
        let cfg = BenchConfig::new(Profile::Full, 7).with_trials(12);
        let meta = RunMeta::capture(&cfg, true);
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["schema_version"], RunMeta::SCHEMA_VERSION);
        assert_eq!(json["config"]["profile"], "full");
        assert_eq!(json["config"]["seed"], 7);
        assert_eq!(json["config"]["warmup_count"], 20);
        assert_eq!(json["config"]["trial_count"], 12);
        assert_eq!(json["parallel"], true);
    }
}
