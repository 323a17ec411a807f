//! Warm-up scheduler.
//!
//! Runs the callable untimed before any trial so one-time first-call cost is
//! excluded from the statistics. `warmup_count = 0` is legal and measures cold
//! starts: the first trial then includes that cost.

use std::hint::black_box;

use log::trace;
use rand_chacha::ChaCha8Rng;

use crate::callable::{invoke, ArgCx, Checkpoints};
use crate::error::{BenchError, BoxError, Phase};

/// Invoke the callable `warmup_count` times, discarding results.
///
/// The first failure aborts priming with [`BenchError::WarmupFailure`].
pub fn prime<A, R, E, G, F>(
    warmup_count: usize,
    args: &mut G,
    f: &mut F,
    checkpoints: &mut Checkpoints,
    rng: &mut ChaCha8Rng,
) -> Result<(), BenchError>
where
    E: Into<BoxError>,
    G: FnMut(&mut ArgCx<'_>) -> A,
    F: FnMut(A, &mut Checkpoints) -> Result<R, E>,
{
    for call_index in 1..=warmup_count {
        let input = args(&mut ArgCx::new(Phase::Warmup, call_index, rng));
        checkpoints.clear();
        match invoke(f, input, checkpoints) {
            Ok(value) => drop(black_box(value)),
            Err(cause) => return Err(BenchError::WarmupFailure { call_index, cause }),
        }
        trace!("warm-up call {call_index}/{warmup_count} done");
    }
    checkpoints.clear();
    Ok(())
}
