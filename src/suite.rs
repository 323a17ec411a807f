//! Named collections of independent benchmarks.
//!
//! In parallel mode every case runs on its own `rayon` worker with its own
//! [`Bench`](crate::harness::Bench) and probe. Allocation counters are
//! per-thread, so concurrent cases never see each other's allocations; the
//! trials of any one case still run sequentially.

use log::info;
use rayon::prelude::*;

use crate::error::BenchError;
use crate::harness::BenchConfig;
use crate::schema::BenchmarkReport;

type CaseFn = dyn Fn(&BenchConfig) -> Result<BenchmarkReport, BenchError> + Send + Sync;

pub struct Case {
    name: String,
    run: Box<CaseFn>,
}

impl Case {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of one case.
pub type CaseResult = (String, Result<BenchmarkReport, BenchError>);

#[derive(Default)]
pub struct Suite {
    cases: Vec<Case>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, name: impl Into<String>, run: F) -> &mut Self
    where
        F: Fn(&BenchConfig) -> Result<BenchmarkReport, BenchError> + Send + Sync + 'static,
    {
        self.cases.push(Case {
            name: name.into(),
            run: Box::new(run),
        });
        self
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Run every case, in registration order for the results.
    pub fn run(&self, config: &BenchConfig, parallel: bool) -> Vec<CaseResult> {
        info!(
            "running {} case(s){}",
            self.cases.len(),
            if parallel { " in parallel" } else { "" }
        );
        let run_case = |case: &Case| (case.name.clone(), (case.run)(config));
        if parallel {
            self.cases.par_iter().map(run_case).collect()
        } else {
            self.cases.iter().map(run_case).collect()
        }
    }
}
