//! The callable-under-test contract.
//!
//! A callable is any `FnMut(A, &mut Checkpoints) -> Result<R, E>`. Arguments
//! come from a generator `FnMut(&mut ArgCx<'_>) -> A` that is re-invoked for
//! every call, warm-up included.

use std::hint::black_box;
use std::panic::{self, AssertUnwindSafe};

use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::{BoxError, CallFailure, Phase};
use crate::fingerprint::{Fingerprint, TypeFingerprint};

/// Context handed to the argument generator.
pub struct ArgCx<'a> {
    phase: Phase,
    index: usize,
    rng: &'a mut ChaCha8Rng,
}

impl<'a> ArgCx<'a> {
    pub(crate) fn new(phase: Phase, index: usize, rng: &'a mut ChaCha8Rng) -> Self {
        Self { phase, index, rng }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 1-based index of the call within its phase.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_warmup(&self) -> bool {
        self.phase == Phase::Warmup
    }

    /// Seeded generator for reproducible random inputs.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }
}

/// Fingerprint of an intermediate value reported by the callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CheckpointFingerprint {
    pub name: &'static str,
    pub fingerprint: TypeFingerprint,
}

/// Fixed-capacity buffer for intermediate-value fingerprints.
///
/// Capacity is reserved before the timed window opens, so [`record`] never
/// allocates. Entries past capacity are dropped and the buffer is marked
/// truncated.
///
/// [`record`]: Checkpoints::record
#[derive(Debug)]
pub struct Checkpoints {
    enabled: bool,
    capacity: usize,
    entries: Vec<CheckpointFingerprint>,
    truncated: bool,
}

impl Checkpoints {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        let reserved = if enabled { capacity } else { 0 };
        Self {
            enabled,
            capacity: reserved,
            entries: Vec::with_capacity(reserved),
            truncated: false,
        }
    }

    /// Buffer that ignores every record.
    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn record<T: Fingerprint + ?Sized>(&mut self, name: &'static str, value: &T) {
        if !self.enabled {
            return;
        }
        if self.entries.len() == self.capacity {
            self.truncated = true;
            return;
        }
        self.entries.push(CheckpointFingerprint {
            name,
            fingerprint: value.fingerprint(),
        });
    }

    pub fn entries(&self) -> &[CheckpointFingerprint] {
        &self.entries
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.truncated = false;
    }
}

/// Invoke the callable once, turning returned errors and panics into a
/// [`CallFailure`].
#[inline]
pub(crate) fn invoke<A, R, E, F>(f: &mut F, args: A, checkpoints: &mut Checkpoints) -> Result<R, CallFailure>
where
    E: Into<BoxError>,
    F: FnMut(A, &mut Checkpoints) -> Result<R, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| f(black_box(args), checkpoints))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CallFailure::from_error(err.into())),
        Err(payload) => Err(CallFailure::from_panic(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn disabled_buffer_records_nothing() {
        let mut cp = Checkpoints::disabled();
        cp.record("x", &1i64);
        assert!(cp.entries().is_empty());
        assert!(!cp.is_truncated());
    }

    #[test]
    fn overflow_is_flagged_without_growing() {
        let mut cp = Checkpoints::new(true, 2);
        cp.record("a", &1i64);
        cp.record("b", &1.0f64);
        cp.record("c", &true);
        assert_eq!(cp.entries().len(), 2);
        assert!(cp.is_truncated());
        assert_eq!(cp.entries()[1].fingerprint, TypeFingerprint::F64);

        cp.clear();
        assert!(cp.entries().is_empty());
        assert!(!cp.is_truncated());
    }

    #[test]
    fn invoke_maps_errors_and_panics() {
        let mut cp = Checkpoints::disabled();

        let mut ok = |x: i64, _: &mut Checkpoints| Ok::<_, Infallible>(x * 2);
        assert_eq!(invoke(&mut ok, 21, &mut cp).unwrap(), 42);

        let mut failing = |_: (), _: &mut Checkpoints| Err::<i64, _>("bad input");
        let err = invoke(&mut failing, (), &mut cp).unwrap_err();
        assert_eq!(err.to_string(), "bad input");

        let mut panicking = |_: (), _: &mut Checkpoints| -> Result<i64, Infallible> {
            panic!("exploded")
        };
        let err = invoke(&mut panicking, (), &mut cp).unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "panicked: exploded");
    }
}
