//! Error taxonomy for benchmark runs.
//!
//! Failures raised by the callable-under-test are never swallowed: they carry
//! the original error (or panic message) verbatim together with the phase and
//! index of the call that produced them.

use std::any::Any;
use std::fmt;
use std::io;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Boxed error type accepted from callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which part of a run an invocation belonged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Warmup,
    Trial,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Warmup => "warmup",
            Phase::Trial => "trial",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a single failed invocation.
#[derive(Clone, Debug, Error)]
pub enum CallFailure {
    /// The callable returned an error.
    #[error("{0}")]
    Error(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// The callable panicked; holds the panic message when it was a string.
    #[error("panicked: {0}")]
    Panic(String),
}

impl CallFailure {
    pub(crate) fn from_error(err: BoxError) -> Self {
        CallFailure::Error(Arc::from(err))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        CallFailure::Panic(msg)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, CallFailure::Panic(_))
    }
}

impl Serialize for CallFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A timed trial failed. Trials after it were not run.
#[derive(Clone, Debug, Error, Serialize)]
#[error("trial {trial_index} failed: {cause}")]
pub struct TrialFailure {
    pub trial_index: usize,
    pub cause: CallFailure,
}

impl TrialFailure {
    pub fn phase(&self) -> Phase {
        Phase::Trial
    }
}

/// Configuration rejected before any probing started.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("trial_count must be at least 1")]
    ZeroTrials,
    #[error("checkpoint_capacity must be at least 1 when intermediate tracking is enabled")]
    ZeroCheckpointCapacity,
}

/// Errors returned from [`Bench::run`](crate::harness::Bench::run).
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The callable failed while priming; no report is produced.
    #[error("warm-up call {call_index} failed: {cause}")]
    WarmupFailure { call_index: usize, cause: CallFailure },

    #[error("report sink failed: {0}")]
    Sink(#[from] io::Error),
}

impl BenchError {
    /// Phase of the failing call, if the error came from the callable.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            BenchError::WarmupFailure { .. } => Some(Phase::Warmup),
            _ => None,
        }
    }
}
