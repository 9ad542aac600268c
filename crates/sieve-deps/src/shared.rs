use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use sieve_core::DependencyRecorder;

use crate::dependencies::Dependencies;

/// A thread-safe handle to a `Dependencies` instance, shared across the
/// concurrent `WorkerPool` tasks of one build. Each task calls
/// `set_dependencies` from inside its own `Transform::process_string`
/// invocation; this wrapper is what actually implements
/// `DependencyRecorder` and forwards into the locked `Dependencies`.
#[derive(Clone)]
pub struct SharedDependencies(Arc<Mutex<Dependencies>>);

impl SharedDependencies {
    pub fn new(dependencies: Dependencies) -> Self {
        SharedDependencies(Arc::new(Mutex::new(dependencies)))
    }

    /// Consume the handle, returning the inner `Dependencies` — fails
    /// (by panicking) only if another clone is still outstanding, which
    /// never happens once the engine has awaited every worker task.
    pub fn into_inner(self) -> Dependencies {
        match Arc::try_unwrap(self.0) {
            Ok(mutex) => mutex.into_inner(),
            Err(arc) => arc.lock().clone(),
        }
    }

    pub fn seal(&self) {
        self.0.lock().seal();
    }

    pub fn capture_dependency_state(&self) {
        self.0.lock().capture_dependency_state();
    }

    pub fn get_invalidated_files(&self) -> Vec<String> {
        self.0.lock().get_invalidated_files()
    }

    pub fn copy_without(&self, files: &[String]) -> Dependencies {
        self.0.lock().copy_without(files)
    }
}

impl DependencyRecorder for SharedDependencies {
    fn set_dependencies(&self, relative_path: &str, deps: &[PathBuf]) {
        if let Err(err) = self.0.lock().set_dependencies(relative_path, deps) {
            log::warn!("dropping dependency declaration for {relative_path}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_declarations_into_the_inner_instance() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedDependencies::new(Dependencies::new(dir.path()));
        shared.set_dependencies("a.js", &[PathBuf::from("b.js")]);
        shared.seal();
        shared.capture_dependency_state();
        assert!(shared.get_invalidated_files().is_empty());
    }
}
