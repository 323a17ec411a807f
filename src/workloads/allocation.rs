//! Prefix sums into a new vector versus in place.
//!
//! The in-place variant mutates its argument, which is why arguments are
//! generated fresh for every call: reusing one would feed later trials
//! already-summed data.

use rand::Rng;

use crate::error::BenchError;
use crate::harness::{Bench, BenchConfig};
use crate::schema::BenchmarkReport;

pub const ALLOC: &str = "prefix.alloc";
pub const IN_PLACE: &str = "prefix.in_place";

pub fn prefix_sums(xs: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(xs.len());
    let mut acc = 0.0;
    for &x in xs {
        acc += x;
        out.push(acc);
    }
    out
}

pub fn prefix_sums_in_place(xs: &mut [f64]) {
    let mut acc = 0.0;
    for x in xs.iter_mut() {
        acc += *x;
        *x = acc;
    }
}

fn input(rng: &mut impl Rng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(0.0..10.0)).collect()
}

pub fn run_alloc(cfg: &BenchConfig) -> Result<BenchmarkReport, BenchError> {
    let len = cfg.profile.input_len();
    Bench::new(ALLOC, cfg.clone()).run_infallible(
        |cx| (input(cx.rng(), len),),
        |(xs,): (Vec<f64>,), _| prefix_sums(&xs),
    )
}

pub fn run_in_place(cfg: &BenchConfig) -> Result<BenchmarkReport, BenchError> {
    let len = cfg.profile.input_len();
    Bench::new(IN_PLACE, cfg.clone()).run_infallible(
        |cx| (input(cx.rng(), len),),
        |(mut xs,): (Vec<f64>,), _| {
            prefix_sums_in_place(&mut xs);
            xs
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_compute_the_same_sums() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        let mut ys = xs.clone();
        prefix_sums_in_place(&mut ys);
        assert_eq!(prefix_sums(&xs), ys);
        assert_eq!(ys, vec![1.0, 3.0, 6.0, 10.0]);
    }
}
