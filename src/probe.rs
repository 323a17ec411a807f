//! Clock and allocation probe.
//!
//! A [`Probe`] reads a monotonic clock and a cumulative allocation counter at
//! two points and turns the pair of readings into a [`Sample`]. Both sources are
//! injected through the [`Clock`] and [`AllocCounter`] traits, so the engine can
//! run against the real process ([`MonotonicClock`] + [`ThreadAllocCounter`]) or
//! against scripted fakes ([`ManualClock`] + [`ManualCounter`]).
//!
//! # Allocation counting
//!
//! Real allocation numbers require [`CountingAllocator`] to be installed as the
//! global allocator of the final binary:
//!
//! ```
//! use stability_bench::probe::CountingAllocator;
//!
//! #[global_allocator]
//! static GLOBAL: CountingAllocator = CountingAllocator::new(std::alloc::System);
//! # fn main() {}
//! ```
//!
//! Counters are kept per thread, so benchmarks running on different threads
//! never observe each other's allocations.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Monotonic time source in nanoseconds.
pub trait Clock {
    fn now_ns(&self) -> u64;
}

/// Cumulative count of bytes allocated by the current execution context.
pub trait AllocCounter {
    fn allocated_bytes(&self) -> u64;

    /// Whether the counter reflects real allocations.
    fn is_tracking(&self) -> bool {
        true
    }
}

/// Opaque pair of readings taken by [`Probe::start`].
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    ticks: u64,
    allocated: u64,
}

/// Deltas between a [`Snapshot`] and the matching [`Probe::stop`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    pub elapsed_ns: u64,
    pub allocated_bytes: u64,
    /// The allocation counter moved backwards (wrapped or was reset); the
    /// delta was clamped to 0.
    pub counter_anomaly: bool,
}

/// Clock & allocation probe.
#[derive(Clone, Debug)]
pub struct Probe<C = MonotonicClock, A = ThreadAllocCounter> {
    clock: C,
    counter: A,
}

impl Probe {
    /// Probe over the process monotonic clock and this thread's allocation counter.
    pub fn system() -> Self {
        Self::new(MonotonicClock::new(), ThreadAllocCounter)
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::system()
    }
}

impl<C: Clock, A: AllocCounter> Probe<C, A> {
    pub fn new(clock: C, counter: A) -> Self {
        Self { clock, counter }
    }

    /// Read the counter first, then the clock, so the timed window does not
    /// include the counter read.
    #[inline]
    pub fn start(&self) -> Snapshot {
        let allocated = self.counter.allocated_bytes();
        let ticks = self.clock.now_ns();
        Snapshot { ticks, allocated }
    }

    #[inline]
    pub fn stop(&self, snapshot: Snapshot) -> Sample {
        let ticks = self.clock.now_ns();
        let allocated = self.counter.allocated_bytes();

        let counter_anomaly = allocated < snapshot.allocated;
        Sample {
            elapsed_ns: ticks.saturating_sub(snapshot.ticks),
            allocated_bytes: allocated.saturating_sub(snapshot.allocated),
            counter_anomaly,
        }
    }

    pub fn is_tracking_allocations(&self) -> bool {
        self.counter.is_tracking()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn counter(&self) -> &A {
        &self.counter
    }
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

thread_local! {
    static THREAD_ALLOCATED: Cell<u64> = const { Cell::new(0) };
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

#[inline]
fn record_allocation(bytes: usize) {
    if !INSTALLED.load(Ordering::Relaxed) {
        INSTALLED.store(true, Ordering::Relaxed);
    }
    // `try_with` fails only while the thread is being torn down.
    let _ = THREAD_ALLOCATED.try_with(|c| c.set(c.get().wrapping_add(bytes as u64)));
}

/// Bytes allocated so far by the calling thread through [`CountingAllocator`].
pub fn thread_allocated_bytes() -> u64 {
    THREAD_ALLOCATED.try_with(Cell::get).unwrap_or(0)
}

/// Whether a [`CountingAllocator`] has served at least one allocation.
pub fn counting_allocator_active() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

/// [`AllocCounter`] reading the calling thread's counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadAllocCounter;

impl AllocCounter for ThreadAllocCounter {
    #[inline]
    fn allocated_bytes(&self) -> u64 {
        thread_allocated_bytes()
    }

    fn is_tracking(&self) -> bool {
        counting_allocator_active()
    }
}

/// A `GlobalAlloc` wrapper counting allocated bytes per thread.
///
/// `alloc` and `alloc_zeroed` count the full layout size; `realloc` counts only
/// growth. Deallocation is not subtracted: the counter measures bytes
/// allocated, not bytes live.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator<A = System> {
    inner: A,
}

impl<A> CountingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            record_allocation(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_allocation(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() && new_size > layout.size() {
            record_allocation(new_size - layout.size());
        }
        new_ptr
    }
}

/// Scripted clock for deterministic tests. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ns: u64) {
        self.now.set(self.now.get().saturating_add(ns));
    }

    pub fn set(&self, ns: u64) {
        self.now.set(ns);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.get()
    }
}

/// Scripted allocation counter. Clones share the same count.
#[derive(Clone, Debug, Default)]
pub struct ManualCounter {
    bytes: Rc<Cell<u64>>,
}

impl ManualCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.bytes.set(self.bytes.get().wrapping_add(bytes));
    }

    /// Overwrite the counter, e.g. to simulate a wrap or a reset.
    pub fn set(&self, bytes: u64) {
        self.bytes.set(bytes);
    }
}

impl AllocCounter for ManualCounter {
    fn allocated_bytes(&self) -> u64 {
        self.bytes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> (ManualClock, ManualCounter, Probe<ManualClock, ManualCounter>) {
        let clock = ManualClock::new();
        let counter = ManualCounter::new();
        let probe = Probe::new(clock.clone(), counter.clone());
        (clock, counter, probe)
    }

    #[test]
    fn deltas_follow_the_sources() {
        let (clock, counter, probe) = manual();
        clock.set(1_000);
        counter.set(64);

        let snap = probe.start();
        clock.advance(250);
        counter.add(128);
        let sample = probe.stop(snap);

        assert_eq!(sample.elapsed_ns, 250);
        assert_eq!(sample.allocated_bytes, 128);
        assert!(!sample.counter_anomaly);
    }

    #[test]
    fn counter_going_backwards_is_clamped_and_flagged() {
        let (_clock, counter, probe) = manual();
        counter.set(u64::MAX - 8);

        let snap = probe.start();
        // Wraps past zero.
        counter.add(32);
        let sample = probe.stop(snap);

        assert_eq!(sample.allocated_bytes, 0);
        assert!(sample.counter_anomaly);
    }

    #[test]
    fn clock_regression_saturates() {
        let (clock, _counter, probe) = manual();
        clock.set(500);
        let snap = probe.start();
        clock.set(100);
        assert_eq!(probe.stop(snap).elapsed_ns, 0);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut last = clock.now_ns();
        for _ in 0..1_000 {
            let now = clock.now_ns();
            assert!(now >= last);
            last = now;
        }
    }
}
