//! Benchmark callables for time, allocation and type stability.
//!
//! A run primes the callable with untimed warm-up calls, times a number of
//! trials with fresh arguments under a [`probe::Probe`], fingerprints the
//! result (and optionally arguments and intermediate values) of every trial,
//! and reduces everything into a [`schema::BenchmarkReport`].
//!
//! ```
//! use stability_bench::harness::{Bench, BenchConfig};
//!
//! # fn main() -> Result<(), stability_bench::BenchError> {
//! let report = Bench::new("halve", BenchConfig::default())
//!     .run_infallible(|cx| (cx.index() as f64,), |(x,): (f64,), _| x / 2.0)?;
//! assert!(report.verdict.is_stable());
//! assert_eq!(report.trials_completed, 30);
//! # Ok(())
//! # }
//! ```

use clap::ValueEnum;

pub mod callable;
pub mod error;
pub mod fingerprint;
pub mod harness;
pub mod probe;
pub mod report;
pub mod schema;
pub mod stability;
pub mod suite;
pub mod trial;
pub mod warmup;
pub mod workloads;

pub use callable::{ArgCx, Checkpoints};
pub use error::{BenchError, CallFailure, ConfigError, Phase, TrialFailure};
pub use fingerprint::{Fingerprint, TypeFingerprint, Value};
pub use harness::{Bench, BenchConfig, Profile};
pub use schema::BenchmarkReport;
pub use stability::StabilityVerdict;

/// Built-in workload selection.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum WorkloadKind {
    /// Run every built-in workload.
    #[default]
    All,
    /// Sum with an f64 accumulator.
    SumStable,
    /// Sum with a dynamically typed accumulator (type-unstable).
    SumDynamic,
    /// Sum through bounds-checked indexing.
    IndexChecked,
    /// Sum through a slice iterator.
    IndexIter,
    /// Prefix sums into a freshly allocated vector.
    PrefixAlloc,
    /// Prefix sums in place.
    PrefixInPlace,
}
