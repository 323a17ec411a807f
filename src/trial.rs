//! Trial runner.
//!
//! Executes timed trials strictly one after another on the calling thread, so
//! every allocation delta belongs to exactly one call.

use std::hint::black_box;

use log::trace;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::callable::{invoke, ArgCx, CheckpointFingerprint, Checkpoints};
use crate::error::{BoxError, Phase, TrialFailure};
use crate::fingerprint::{ArgList, Fingerprint, FingerprintList, TypeFingerprint};
use crate::harness::BenchConfig;
use crate::probe::{AllocCounter, Clock, Probe};

/// Measurements and fingerprints of one completed trial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrialRecord {
    /// 1-based.
    pub trial_index: usize,
    pub duration_ns: u64,
    pub bytes_allocated: u64,
    pub counter_anomaly: bool,
    pub result_fingerprint: TypeFingerprint,
    pub argument_fingerprints: FingerprintList,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<CheckpointFingerprint>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub checkpoints_truncated: bool,
}

/// Output of [`run_trials`]: the completed records plus the failure that
/// stopped the run early, if any.
#[derive(Clone, Debug)]
pub struct TrialRun {
    pub records: Vec<TrialRecord>,
    pub failure: Option<TrialFailure>,
}

impl TrialRun {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

pub fn run_trials<C, Al, A, R, E, G, F>(
    config: &BenchConfig,
    probe: &Probe<C, Al>,
    args: &mut G,
    f: &mut F,
    checkpoints: &mut Checkpoints,
    rng: &mut ChaCha8Rng,
) -> TrialRun
where
    C: Clock,
    Al: AllocCounter,
    A: ArgList,
    R: Fingerprint,
    E: Into<BoxError>,
    G: FnMut(&mut ArgCx<'_>) -> A,
    F: FnMut(A, &mut Checkpoints) -> Result<R, E>,
{
    let mut records = Vec::with_capacity(config.trial_count);
    let mut failure = None;

    for trial_index in 1..=config.trial_count {
        let input = args(&mut ArgCx::new(Phase::Trial, trial_index, rng));
        let argument_fingerprints = if config.track_arguments {
            input.fingerprints()
        } else {
            FingerprintList::new()
        };
        checkpoints.clear();

        let snapshot = probe.start();
        let outcome = invoke(f, input, checkpoints);
        let sample = probe.stop(snapshot);

        let value = match outcome {
            Ok(value) => value,
            Err(cause) => {
                failure = Some(TrialFailure { trial_index, cause });
                break;
            }
        };
        let result_fingerprint = value.fingerprint();
        drop(black_box(value));

        trace!(
            "trial {trial_index}: {}ns, {}B, {result_fingerprint}",
            sample.elapsed_ns,
            sample.allocated_bytes
        );
        records.push(TrialRecord {
            trial_index,
            duration_ns: sample.elapsed_ns,
            bytes_allocated: sample.allocated_bytes,
            counter_anomaly: sample.counter_anomaly,
            result_fingerprint,
            argument_fingerprints,
            checkpoints: checkpoints.entries().to_vec(),
            checkpoints_truncated: checkpoints.is_truncated(),
        });
    }

    TrialRun { records, failure }
}
