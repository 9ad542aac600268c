use std::sync::atomic::{AtomicUsize, Ordering};

/// An injectable counter seam the `Processor` increments.
///
/// The spec's test suite counts `process_string` invocations from the
/// outside; rather than exposing a mutable public field on the
/// transform itself (which would leak build-loop bookkeeping into the
/// host's own type), tests construct a concrete `InstrumentationSink`
/// and hand it to the `Processor`/`Engine`.
pub trait InstrumentationSink: Send + Sync {
    fn record_process_string(&self);
    fn record_post_process(&self);
    fn record_persistent_cache_hit(&self);
    fn record_persistent_cache_prime(&self);
}

/// A concrete, atomic-counter `InstrumentationSink`, suitable for both
/// production use (e.g. feeding a `--stats` summary) and test
/// assertions.
#[derive(Debug, Default)]
pub struct Counters {
    pub process_string_calls: AtomicUsize,
    pub post_process_calls: AtomicUsize,
    pub persistent_cache_hits: AtomicUsize,
    pub persistent_cache_primes: AtomicUsize,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    pub fn process_string_calls(&self) -> usize {
        self.process_string_calls.load(Ordering::SeqCst)
    }

    pub fn post_process_calls(&self) -> usize {
        self.post_process_calls.load(Ordering::SeqCst)
    }

    pub fn persistent_cache_hits(&self) -> usize {
        self.persistent_cache_hits.load(Ordering::SeqCst)
    }

    pub fn persistent_cache_primes(&self) -> usize {
        self.persistent_cache_primes.load(Ordering::SeqCst)
    }
}

impl InstrumentationSink for Counters {
    fn record_process_string(&self) {
        self.process_string_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn record_post_process(&self) {
        self.post_process_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn record_persistent_cache_hit(&self) {
        self.persistent_cache_hits.fetch_add(1, Ordering::SeqCst);
    }

    fn record_persistent_cache_prime(&self) {
        self.persistent_cache_primes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A sink that discards every event, for callers that don't need
/// counts (e.g. `sieve-host`'s long-running driver loop).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl InstrumentationSink for NullSink {
    fn record_process_string(&self) {}
    fn record_post_process(&self) {}
    fn record_persistent_cache_hit(&self) {}
    fn record_persistent_cache_prime(&self) {}
}
