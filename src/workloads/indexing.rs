//! Bounds-checked indexing versus iterator traversal.
//!
//! Eliding bounds checks is not an engine feature: it is benchmarked as two
//! callables computing the same sum.

use rand::Rng;

use crate::error::BenchError;
use crate::harness::{Bench, BenchConfig};
use crate::schema::BenchmarkReport;

pub const CHECKED: &str = "index.checked";
pub const ITER: &str = "index.iter";

#[allow(clippy::needless_range_loop)]
pub fn sum_indexed(xs: &[f64]) -> f64 {
    let mut acc = 0.0;
    for i in 0..xs.len() {
        acc += xs[i];
    }
    acc
}

pub fn sum_iter(xs: &[f64]) -> f64 {
    xs.iter().sum()
}

fn bench(name: &'static str, cfg: &BenchConfig, f: fn(&[f64]) -> f64) -> Result<BenchmarkReport, BenchError> {
    let len = cfg.profile.input_len();
    Bench::new(name, cfg.clone()).run_infallible(
        |cx| {
            let rng = cx.rng();
            ((0..len).map(|_| rng.gen::<f64>()).collect::<Vec<f64>>(),)
        },
        |(xs,): (Vec<f64>,), _| f(&xs),
    )
}

pub fn run_checked(cfg: &BenchConfig) -> Result<BenchmarkReport, BenchError> {
    bench(CHECKED, cfg, sum_indexed)
}

pub fn run_iter(cfg: &BenchConfig) -> Result<BenchmarkReport, BenchError> {
    bench(ITER, cfg, sum_iter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_variants_agree() {
        let xs: Vec<f64> = (0..100).map(|i| i as f64 * 0.5).collect();
        assert_eq!(sum_indexed(&xs), sum_iter(&xs));
    }

    #[test]
    fn reports_carry_the_variant_name() {
        let cfg = BenchConfig::default().with_trials(3);
        assert_eq!(run_checked(&cfg).unwrap().name, CHECKED);
        assert_eq!(run_iter(&cfg).unwrap().name, ITER);
    }
}
