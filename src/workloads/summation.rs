//! Summation with a fixed-type accumulator versus a dynamically typed one.
//!
//! The dynamic variant starts its accumulator as the integer `0` and adds
//! floats to it, so the result is an `i64` for empty input and an `f64`
//! otherwise. Inputs are occasionally empty, which makes it type-unstable.

use rand::Rng;

use crate::callable::{ArgCx, Checkpoints};
use crate::error::BenchError;
use crate::fingerprint::Value;
use crate::harness::{Bench, BenchConfig};
use crate::schema::BenchmarkReport;

pub const STABLE: &str = "sum.stable";
pub const DYNAMIC: &str = "sum.dynamic";

/// One in this many generated inputs is empty.
const EMPTY_ONE_IN: u32 = 4;

pub fn sum_stable(xs: &[f64]) -> f64 {
    let mut acc = 0.0;
    for &x in xs {
        acc += x;
    }
    acc
}

pub fn sum_dynamic(xs: &[f64], checkpoints: &mut Checkpoints) -> Value {
    let mut acc = Value::Int(0);
    checkpoints.record("acc.initial", &acc);
    for &x in xs {
        acc = acc + Value::Float(x);
    }
    checkpoints.record("acc.final", &acc);
    acc
}

fn samples(cx: &mut ArgCx<'_>, len: usize) -> Vec<f64> {
    let rng = cx.rng();
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

pub fn run_stable(cfg: &BenchConfig) -> Result<BenchmarkReport, BenchError> {
    let len = cfg.profile.input_len();
    Bench::new(STABLE, cfg.clone()).run_infallible(
        |cx| (samples(cx, len),),
        |(xs,): (Vec<f64>,), _| sum_stable(&xs),
    )
}

pub fn run_dynamic(cfg: &BenchConfig) -> Result<BenchmarkReport, BenchError> {
    let len = cfg.profile.input_len();
    Bench::new(DYNAMIC, cfg.clone()).run_infallible(
        |cx| {
            let n = if cx.rng().gen_ratio(1, EMPTY_ONE_IN) { 0 } else { len };
            (samples(cx, n),)
        },
        |(xs,): (Vec<f64>,), cp| sum_dynamic(&xs, cp),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{Fingerprint, TypeFingerprint};

    #[test]
    fn dynamic_sum_changes_type_with_input() {
        let mut cp = Checkpoints::new(true, 4);
        assert_eq!(sum_dynamic(&[], &mut cp).fingerprint(), TypeFingerprint::I64);
        assert_eq!(sum_dynamic(&[0.5, 0.25], &mut cp).fingerprint(), TypeFingerprint::F64);
        assert_eq!(cp.entries().len(), 4);
    }

    #[test]
    fn stable_sum_matches_iterator_sum() {
        let xs = [1.0, 2.5, -0.5];
        assert_eq!(sum_stable(&xs), xs.iter().sum::<f64>());
    }

    #[test]
    fn stable_workload_is_stable() {
        let cfg = BenchConfig::default().with_trials(8);
        let report = run_stable(&cfg).unwrap();
        assert!(report.verdict.is_stable());
        assert_eq!(report.trials_completed, 8);
    }

    #[test]
    fn dynamic_workload_is_unstable_over_enough_trials() {
        // With one empty input in four, 64 trials mixing both outcomes is
        // all but certain; the seed makes it deterministic.
        let cfg = BenchConfig::default().with_trials(64).with_warmup(0);
        let report = run_dynamic(&cfg).unwrap();
        assert!(!report.verdict.is_stable());
    }
}
