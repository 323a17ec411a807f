use std::convert::Infallible;

use clap::ValueEnum;
use log::debug;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::callable::{ArgCx, Checkpoints};
use crate::error::{BenchError, BoxError, ConfigError};
use crate::fingerprint::{ArgList, Fingerprint};
use crate::probe::{AllocCounter, Clock, Probe};
use crate::report::{self, NullSink, ReportSink};
use crate::schema::BenchmarkReport;
use crate::{stability, trial, warmup};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }

    pub fn warmup_count(&self) -> usize {
        match self {
            Profile::Quick => 3,
            Profile::Full => 20,
        }
    }

    pub fn trial_count(&self) -> usize {
        match self {
            Profile::Quick => 30,
            Profile::Full => 300,
        }
    }

    /// Element count for the built-in workloads' inputs.
    pub fn input_len(&self) -> usize {
        match self {
            Profile::Quick => 1_024,
            Profile::Full => 16_384,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
    /// Untimed priming calls. 0 measures cold starts.
    pub warmup_count: usize,
    /// Timed calls; must be at least 1.
    pub trial_count: usize,
    /// Collect checkpoint fingerprints reported by the callable.
    pub track_intermediate: bool,
    /// Fingerprint the generated arguments of every trial.
    pub track_arguments: bool,
    /// Checkpoint slots reserved per trial.
    pub checkpoint_capacity: usize,
}

impl BenchConfig {
    pub fn new(profile: Profile, seed: u64) -> Self {
        Self {
            profile,
            seed,
            warmup_count: profile.warmup_count(),
            trial_count: profile.trial_count(),
            track_intermediate: false,
            track_arguments: true,
            checkpoint_capacity: 16,
        }
    }

    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    pub fn with_warmup(mut self, warmup_count: usize) -> Self {
        self.warmup_count = warmup_count;
        self
    }

    pub fn with_trials(mut self, trial_count: usize) -> Self {
        self.trial_count = trial_count;
        self
    }

    pub fn with_track_intermediate(mut self, enabled: bool) -> Self {
        self.track_intermediate = enabled;
        self
    }

    pub fn with_track_arguments(mut self, enabled: bool) -> Self {
        self.track_arguments = enabled;
        self
    }

    pub fn with_checkpoint_capacity(mut self, capacity: usize) -> Self {
        self.checkpoint_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trial_count == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.track_intermediate && self.checkpoint_capacity == 0 {
            return Err(ConfigError::ZeroCheckpointCapacity);
        }
        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(Profile::Quick, 0)
    }
}

/// A named benchmark bound to a configuration and a probe.
///
/// ```
/// use rand::Rng;
/// use stability_bench::harness::{Bench, BenchConfig};
///
/// # fn main() -> Result<(), stability_bench::BenchError> {
/// let report = Bench::new("sum", BenchConfig::default().with_trials(5)).run_infallible(
///     |cx| ((0..64).map(|_| cx.rng().gen::<f64>()).collect::<Vec<_>>(),),
///     |(xs,): (Vec<f64>,), _| xs.iter().sum::<f64>(),
/// )?;
/// assert!(report.verdict.is_stable());
/// assert_eq!(report.records.len(), 5);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Bench<C = crate::probe::MonotonicClock, A = crate::probe::ThreadAllocCounter> {
    name: String,
    config: BenchConfig,
    probe: Probe<C, A>,
}

impl Bench {
    pub fn new(name: impl Into<String>, config: BenchConfig) -> Self {
        Self {
            name: name.into(),
            config,
            probe: Probe::system(),
        }
    }
}

impl<C: Clock, Al: AllocCounter> Bench<C, Al> {
    /// Replace the probe, e.g. with scripted fakes.
    pub fn with_probe<C2: Clock, A2: AllocCounter>(self, probe: Probe<C2, A2>) -> Bench<C2, A2> {
        Bench {
            name: self.name,
            config: self.config,
            probe,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run<A, R, E, G, F>(&self, args: G, f: F) -> Result<BenchmarkReport, BenchError>
    where
        A: ArgList,
        R: Fingerprint,
        E: Into<BoxError>,
        G: FnMut(&mut ArgCx<'_>) -> A,
        F: FnMut(A, &mut Checkpoints) -> Result<R, E>,
    {
        self.run_into(args, f, &mut NullSink)
    }

    /// [`run`](Self::run) for callables that cannot fail (panics are still caught).
    pub fn run_infallible<A, R, G, F>(&self, args: G, mut f: F) -> Result<BenchmarkReport, BenchError>
    where
        A: ArgList,
        R: Fingerprint,
        G: FnMut(&mut ArgCx<'_>) -> A,
        F: FnMut(A, &mut Checkpoints) -> R,
    {
        self.run(args, move |a: A, cp: &mut Checkpoints| Ok::<R, Infallible>(f(a, cp)))
    }

    /// Validate, prime, run trials, analyze and aggregate, then hand the report
    /// to `sink` before returning it.
    ///
    /// Warm-up failures and invalid configuration are errors. A failed trial is
    /// not: the report comes back with `incomplete` set.
    pub fn run_into<A, R, E, G, F, S>(
        &self,
        mut args: G,
        mut f: F,
        sink: &mut S,
    ) -> Result<BenchmarkReport, BenchError>
    where
        A: ArgList,
        R: Fingerprint,
        E: Into<BoxError>,
        G: FnMut(&mut ArgCx<'_>) -> A,
        F: FnMut(A, &mut Checkpoints) -> Result<R, E>,
        S: ReportSink + ?Sized,
    {
        let cfg = &self.config;
        cfg.validate()?;

        let mut rng = cfg.rng();
        let mut checkpoints = Checkpoints::new(cfg.track_intermediate, cfg.checkpoint_capacity);

        debug!("{}: {} warm-up calls", self.name, cfg.warmup_count);
        warmup::prime(cfg.warmup_count, &mut args, &mut f, &mut checkpoints, &mut rng)?;

        debug!("{}: {} trials", self.name, cfg.trial_count);
        let run = trial::run_trials(cfg, &self.probe, &mut args, &mut f, &mut checkpoints, &mut rng);

        let verdict = stability::analyze(&run.records);
        let report = report::aggregate(
            &self.name,
            cfg,
            run,
            verdict,
            self.probe.is_tracking_allocations(),
        );
        debug!(
            "{}: {}/{} trials, {}",
            self.name, report.trials_completed, report.trial_count, report.verdict
        );

        sink.emit(&report)?;
        Ok(report)
    }
}
