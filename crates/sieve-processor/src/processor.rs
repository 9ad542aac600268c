use std::sync::Arc;

use sieve_cache::{Cache, ProcessResult};
use sieve_core::{DependencyRecorder, SieveResult};

use crate::instrumentation::InstrumentationSink;
use crate::transform::Transform;

/// Thin indirection between the two cache postures a `Filter` can be
/// constructed with. `Default` never touches a cache at all (matching
/// the spec's "memoryless" name for it); `Persistent` always carries an
/// in-memory layer and optionally a disk-backed one underneath it
/// (`Cache` itself models that two-level split).
pub enum ProcessorStrategy {
    Default,
    Persistent(Arc<Cache>),
}

/// Runs a `Transform` through whichever strategy the `Filter` was
/// configured with.
pub struct Processor {
    strategy: ProcessorStrategy,
}

impl Processor {
    pub fn new(strategy: ProcessorStrategy) -> Self {
        Processor { strategy }
    }

    /// Process one file's contents.
    ///
    /// `force_invalidate` bypasses the persistent cache lookup (but a
    /// hit is still recorded as a prime, since the fresh result is
    /// written back) — used when dependency invalidation triggers a
    /// file's reprocessing even though its own content is unchanged.
    /// `deps` is forwarded to `Transform::process_string` unchanged; on
    /// a cache hit, `process_string` does not run at all, so any
    /// dependency declarations from the prior run are left as-is.
    pub async fn process_string(
        &self,
        transform: &dyn Transform,
        contents: &[u8],
        relative_path: &str,
        force_invalidate: bool,
        deps: &dyn DependencyRecorder,
        sink: &dyn InstrumentationSink,
    ) -> SieveResult<ProcessResult> {
        match &self.strategy {
            ProcessorStrategy::Default => {
                let output = transform.process_string(contents, relative_path, deps).await?;
                sink.record_process_string();
                let result = output.into_result();
                let final_result = transform.post_process(result, relative_path).await?;
                sink.record_post_process();
                Ok(final_result)
            }
            ProcessorStrategy::Persistent(cache) => {
                let key = transform.cache_key_process_string(contents, relative_path);

                if !force_invalidate {
                    let lookup = cache.get(&key);
                    if lookup.cached {
                        sink.record_persistent_cache_hit();
                        let cached = lookup.value.expect("cached lookup carries a value");
                        let final_result = transform.post_process(cached, relative_path).await?;
                        sink.record_post_process();
                        return Ok(final_result);
                    }
                }

                let output = transform.process_string(contents, relative_path, deps).await?;
                sink.record_process_string();
                let result = output.into_result();
                cache.set(&key, result.clone());
                sink.record_persistent_cache_prime();

                let final_result = transform.post_process(result, relative_path).await?;
                sink.record_post_process();
                Ok(final_result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::Counters;
    use async_trait::async_trait;
    use sieve_cache::PersistentCache;
    use sieve_core::NullRecorder;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Upper;

    #[async_trait]
    impl Transform for Upper {
        async fn process_string(
            &self,
            contents: &[u8],
            _relative_path: &str,
            _deps: &dyn DependencyRecorder,
        ) -> SieveResult<crate::transform::ProcessOutput> {
            Ok(String::from_utf8_lossy(contents).to_uppercase().into_bytes().into())
        }
    }

    struct RewritingPostProcess {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transform for RewritingPostProcess {
        async fn process_string(
            &self,
            contents: &[u8],
            _relative_path: &str,
            _deps: &dyn DependencyRecorder,
        ) -> SieveResult<crate::transform::ProcessOutput> {
            Ok(contents.to_vec().into())
        }

        async fn post_process(&self, mut result: ProcessResult, _relative_path: &str) -> SieveResult<ProcessResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            result.output.push(b'!');
            Ok(result)
        }
    }

    struct RecordingDeclares;

    #[async_trait]
    impl Transform for RecordingDeclares {
        async fn process_string(
            &self,
            contents: &[u8],
            relative_path: &str,
            deps: &dyn DependencyRecorder,
        ) -> SieveResult<crate::transform::ProcessOutput> {
            deps.set_dependencies(relative_path, &[PathBuf::from("shared.js")]);
            Ok(contents.to_vec().into())
        }
    }

    #[tokio::test]
    async fn default_strategy_never_caches() {
        let processor = Processor::new(ProcessorStrategy::Default);
        let sink = Counters::new();
        let out = processor.process_string(&Upper, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        assert_eq!(out.output, b"HI");
        processor.process_string(&Upper, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        assert_eq!(sink.process_string_calls(), 2);
    }

    #[tokio::test]
    async fn persistent_strategy_hits_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let persistent = PersistentCache::new(dir.path(), "plugin-key");
        let cache = Arc::new(Cache::new(Some(persistent)));
        let processor = Processor::new(ProcessorStrategy::Persistent(cache));
        let sink = Counters::new();

        processor.process_string(&Upper, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        assert_eq!(sink.process_string_calls(), 1);
        assert_eq!(sink.persistent_cache_primes(), 1);

        processor.process_string(&Upper, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        assert_eq!(sink.process_string_calls(), 1);
        assert_eq!(sink.persistent_cache_hits(), 1);
    }

    #[tokio::test]
    async fn post_process_runs_on_cache_hit_but_return_value_is_not_persisted() {
        let cache = Arc::new(Cache::new(None));
        let transform = RewritingPostProcess { calls: AtomicUsize::new(0) };
        let processor = Processor::new(ProcessorStrategy::Persistent(cache));
        let sink = Counters::new();

        let first = processor.process_string(&transform, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        assert_eq!(first.output, b"hi!");
        let second = processor.process_string(&transform, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        assert_eq!(second.output, b"hi!");

        assert_eq!(sink.process_string_calls(), 1);
        assert_eq!(transform.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_invalidate_bypasses_cache_lookup() {
        let cache = Arc::new(Cache::new(None));
        let processor = Processor::new(ProcessorStrategy::Persistent(cache));
        let sink = Counters::new();

        processor.process_string(&Upper, b"hi", "a.txt", false, &NullRecorder, &sink).await.unwrap();
        processor.process_string(&Upper, b"hi", "a.txt", true, &NullRecorder, &sink).await.unwrap();
        assert_eq!(sink.process_string_calls(), 2);
    }

    #[tokio::test]
    async fn declared_dependency_reaches_the_recorder() {
        struct Capture(std::sync::Mutex<Vec<(String, Vec<PathBuf>)>>);
        impl DependencyRecorder for Capture {
            fn set_dependencies(&self, relative_path: &str, deps: &[PathBuf]) {
                self.0.lock().unwrap().push((relative_path.to_string(), deps.to_vec()));
            }
        }

        let processor = Processor::new(ProcessorStrategy::Default);
        let sink = Counters::new();
        let capture = Capture(std::sync::Mutex::new(Vec::new()));
        processor
            .process_string(&RecordingDeclares, b"x", "has-inlines.js", false, &capture, &sink)
            .await
            .unwrap();

        let recorded = capture.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "has-inlines.js");
    }
}
