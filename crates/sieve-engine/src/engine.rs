use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use sieve_cache::Cache;
use sieve_core::{DependencyRecorder, SieveError, SieveResult};
use sieve_deps::{Dependencies, SharedDependencies};
use sieve_fs::{dedup_patch, diff, Entry, Op, Patch, PatchOp, Snapshot};
use sieve_mirror::MirrorApplier;
use sieve_pool::{first_error, WorkerPool};
use sieve_processor::{Counters, Processor, ProcessorStrategy, Transform};

use crate::options::FilterOptions;
use crate::report::BuildReport;

type BuildFuture = std::pin::Pin<Box<dyn std::future::Future<Output = SieveResult<()>> + Send>>;
type BuildTask = Box<dyn FnOnce() -> BuildFuture + Send>;

/// Forwards to a `SharedDependencies` when dependency invalidation is
/// enabled, otherwise discards declarations. Cloned into every worker
/// task so each one gets its own handle to the same underlying state.
#[derive(Clone)]
enum RecorderHandle {
    Tracked(SharedDependencies),
    Untracked,
}

impl DependencyRecorder for RecorderHandle {
    fn set_dependencies(&self, relative_path: &str, deps: &[PathBuf]) {
        match self {
            RecorderHandle::Tracked(shared) => shared.set_dependencies(relative_path, deps),
            RecorderHandle::Untracked => {}
        }
    }
}

/// Drives one input/output tree pair through a [`Transform`]: snapshot
/// the input, diff against the previous build, dispatch the resulting
/// patch across a bounded worker pool, and mirror the results onto the
/// output tree.
///
/// An `Engine` is built once via [`Engine::new`] and then `build()` is
/// called repeatedly — once per filesystem change in a `--watch` loop,
/// or just once for a single pass.
pub struct Engine {
    transform: Arc<dyn Transform>,
    options: FilterOptions,
    src_dir: PathBuf,
    dest_dir: PathBuf,
    mirror: Arc<MirrorApplier>,
    pool: WorkerPool,
    processor: Option<Arc<Processor>>,
    prev_snapshot: Snapshot<Entry>,
    dependencies: Option<SharedDependencies>,
    needs_reset: bool,
    sink: Arc<Counters>,
}

impl Engine {
    /// Fails with `SieveError::UnimplementedBaseDir` if `options.persist`
    /// is set but `transform.base_dir()` returns `None` — there is no
    /// disk location to root the persistent cache's namespace under.
    pub fn new(
        transform: Arc<dyn Transform>,
        options: FilterOptions,
        src_dir: impl Into<PathBuf>,
        dest_dir: impl Into<PathBuf>,
    ) -> SieveResult<Engine> {
        if options.persist && transform.base_dir().is_none() {
            return Err(SieveError::UnimplementedBaseDir);
        }

        log::info!(
            "sieve filter '{}'{}: persist={} dependency_invalidation={}",
            options.name.as_deref().unwrap_or(transform.name()),
            options.annotation.as_deref().map(|a| format!(" ({a})")).unwrap_or_default(),
            options.persist,
            options.dependency_invalidation,
        );

        let src_dir = src_dir.into();
        let dest_dir = dest_dir.into();
        let mirror = Arc::new(MirrorApplier::new(
            src_dir.clone(),
            dest_dir.clone(),
            options.extensions.clone(),
            options.target_extension.clone(),
        ));
        let pool = WorkerPool::new(options.concurrency);

        Ok(Engine {
            transform,
            options,
            src_dir,
            dest_dir,
            mirror,
            pool,
            processor: None,
            prev_snapshot: Snapshot::empty(),
            dependencies: None,
            needs_reset: false,
            sink: Arc::new(Counters::new()),
        })
    }

    pub fn src_dir(&self) -> &std::path::Path {
        &self.src_dir
    }

    pub fn dest_dir(&self) -> &std::path::Path {
        &self.dest_dir
    }

    /// A running view of the counters this engine's `Processor` has
    /// recorded across every `build()` call so far.
    pub fn counters(&self) -> &Counters {
        &self.sink
    }

    fn init_processor(&self) -> SieveResult<Processor> {
        if !self.options.persist {
            return Ok(Processor::new(ProcessorStrategy::Default));
        }
        let persistent = if sieve_cache::persistence_enabled(true) {
            let root = sieve_cache::default_persistent_cache_root();
            Some(sieve_cache::PersistentCache::new(root, &self.transform.cache_key()))
        } else {
            None
        };
        Ok(Processor::new(ProcessorStrategy::Persistent(Arc::new(Cache::new(persistent)))))
    }

    /// Run one build: walk the input tree, diff it against the last
    /// successful build, and apply the resulting patch to the output
    /// tree. Safe to call repeatedly; a failed build leaves `self`
    /// flagged so the next call starts from a clean slate instead of
    /// compounding partial state.
    pub async fn build(&mut self) -> SieveResult<BuildReport> {
        let start = Instant::now();

        if self.needs_reset {
            self.reset()?;
        }
        self.needs_reset = true;

        if self.processor.is_none() {
            self.processor = Some(Arc::new(self.init_processor()?));
        }
        let processor = self.processor.clone().expect("processor initialized above");

        let next_snapshot = sieve_fs::walk(&self.src_dir)?;

        let invalidated: Vec<String> = if self.options.dependency_invalidation {
            match &self.dependencies {
                Some(deps) => deps.get_invalidated_files(),
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };
        let invalidated_set: HashSet<String> = invalidated.iter().cloned().collect();

        let mut patches: Patch<Entry> = diff(&self.prev_snapshot, &next_snapshot);

        for relative_path in &invalidated {
            let synthetic = match self.prev_snapshot.get(relative_path) {
                Some(entry) => PatchOp { op: Op::Change, relative_path: relative_path.clone(), entry: Some(entry.clone()) },
                None => match next_snapshot.get(relative_path) {
                    Some(entry) => PatchOp { op: Op::Create, relative_path: relative_path.clone(), entry: Some(entry.clone()) },
                    None => continue,
                },
            };
            patches.push(synthetic);
        }
        let patches = dedup_patch(patches);

        self.prev_snapshot = next_snapshot;

        let mut report = BuildReport::default();

        if patches.is_empty() {
            self.needs_reset = false;
            report.duration = start.elapsed();
            return Ok(report);
        }

        // Only replace `self.dependencies` when there is a real build to run —
        // `copy_without` resets `dependents_map`/`all_deps_by_fs_root` to
        // empty, relying on the dispatch below to reseal them. Doing this on
        // the no-op path (where we've already returned above) would leave the
        // maps empty until some future build happened to have patches, and
        // `get_invalidated_files()` would silently stop seeing real changes in
        // the meantime.
        let unlinked: Vec<String> =
            patches.iter().filter(|p| p.op == Op::Unlink).map(|p| p.relative_path.clone()).collect();

        if self.options.dependency_invalidation {
            let base = match self.dependencies.take() {
                Some(shared) => shared.into_inner(),
                None => Dependencies::new(&self.src_dir),
            };
            self.dependencies = Some(SharedDependencies::new(base.copy_without(&unlinked)));
        }

        let recorder = match &self.dependencies {
            Some(shared) => RecorderHandle::Tracked(shared.clone()),
            None => RecorderHandle::Untracked,
        };

        let mut tasks: Vec<BuildTask> = Vec::new();

        for patch in &patches {
            match patch.op {
                Op::Mkdir => {
                    self.mirror.mkdir(&patch.relative_path)?;
                    report.mkdir += 1;
                }
                Op::Rmdir => {
                    self.mirror.rmdir(&patch.relative_path)?;
                    report.rmdir += 1;
                }
                Op::Unlink => {
                    self.mirror.unlink(&patch.relative_path)?;
                    report.unlink += 1;
                }
                Op::Create | Op::Change => {
                    if self.mirror.can_process_file(&patch.relative_path) {
                        let mirror = Arc::clone(&self.mirror);
                        let processor = Arc::clone(&processor);
                        let transform = Arc::clone(&self.transform);
                        let sink = Arc::clone(&self.sink);
                        let recorder = recorder.clone();
                        let relative_path = patch.relative_path.clone();
                        let is_change = patch.op == Op::Change;
                        let force_invalidate = invalidated_set.contains(&patch.relative_path);

                        if is_change {
                            report.changed += 1;
                        } else {
                            report.created += 1;
                        }

                        tasks.push(Box::new(move || {
                            Box::pin(async move {
                                mirror
                                    .process_file(
                                        processor.as_ref(),
                                        transform.as_ref(),
                                        &relative_path,
                                        force_invalidate,
                                        is_change,
                                        &recorder,
                                        sink.as_ref(),
                                    )
                                    .await
                            })
                        }));
                    } else {
                        self.mirror.symlink_unprocessed(&patch.relative_path, patch.op == Op::Change)?;
                    }
                }
            }
        }

        let results = self.pool.run(tasks).await;
        if let Some(err) = first_error(&results) {
            log::error!("build aborting on first worker failure: {err}");
            for result in results {
                result?;
            }
        }

        if let Some(deps) = &self.dependencies {
            deps.seal();
            deps.capture_dependency_state();
        }

        report.process_string_calls = self.sink.process_string_calls();
        report.post_process_calls = self.sink.post_process_calls();
        report.persistent_cache_hits = self.sink.persistent_cache_hits();
        report.persistent_cache_primes = self.sink.persistent_cache_primes();

        self.needs_reset = false;
        report.duration = start.elapsed();
        Ok(report)
    }

    fn reset(&mut self) -> SieveResult<()> {
        self.prev_snapshot = Snapshot::empty();
        self.dependencies = None;
        match std::fs::remove_dir_all(&self.dest_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        std::fs::create_dir_all(&self.dest_dir)?;
        self.mirror.clear_output_links();
        Ok(())
    }
}
