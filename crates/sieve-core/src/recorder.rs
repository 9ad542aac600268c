use std::path::PathBuf;

/// The seam a `Transform` uses to declare "this file depends on these
/// other files" while it runs. `sieve-deps::SharedDependencies`
/// implements this over a `Dependencies` instance; `sieve-engine` hands
/// a `NullRecorder` to transforms when `dependency_invalidation` is
/// disabled, so a transform's own code never needs to branch on
/// whether invalidation tracking is on.
pub trait DependencyRecorder: Send + Sync {
    fn set_dependencies(&self, relative_path: &str, deps: &[PathBuf]);
}

/// A `DependencyRecorder` that discards every declaration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl DependencyRecorder for NullRecorder {
    fn set_dependencies(&self, _relative_path: &str, _deps: &[PathBuf]) {}
}
