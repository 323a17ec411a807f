//! Built-in demonstration workloads.

pub mod allocation;
pub mod indexing;
pub mod summation;

use crate::error::BenchError;
use crate::harness::BenchConfig;
use crate::schema::BenchmarkReport;
use crate::suite::Suite;
use crate::WorkloadKind;

type RunFn = fn(&BenchConfig) -> Result<BenchmarkReport, BenchError>;

/// Every built-in workload with its name, kind and a one-line description.
pub const CATALOG: &[(&str, WorkloadKind, &str, RunFn)] = &[
    (
        summation::STABLE,
        WorkloadKind::SumStable,
        "sum with an f64 accumulator",
        summation::run_stable,
    ),
    (
        summation::DYNAMIC,
        WorkloadKind::SumDynamic,
        "sum with a dynamic accumulator starting as an integer",
        summation::run_dynamic,
    ),
    (
        indexing::CHECKED,
        WorkloadKind::IndexChecked,
        "sum through bounds-checked indexing",
        indexing::run_checked,
    ),
    (
        indexing::ITER,
        WorkloadKind::IndexIter,
        "sum through a slice iterator",
        indexing::run_iter,
    ),
    (
        allocation::ALLOC,
        WorkloadKind::PrefixAlloc,
        "prefix sums into a new vector",
        allocation::run_alloc,
    ),
    (
        allocation::IN_PLACE,
        WorkloadKind::PrefixInPlace,
        "prefix sums in place on a fresh argument",
        allocation::run_in_place,
    ),
];

/// Suite holding the workloads selected by `kind`.
pub fn suite(kind: WorkloadKind) -> Suite {
    let mut suite = Suite::new();
    for &(name, entry_kind, _, run) in CATALOG {
        if kind == WorkloadKind::All || kind == entry_kind {
            suite.add(name, run);
        }
    }
    suite
}
