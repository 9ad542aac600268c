use std::path::PathBuf;

use async_trait::async_trait;
use sieve_cache::ProcessResult;
use sieve_core::fingerprint;
use sieve_core::{DependencyRecorder, SieveResult};

/// The dynamic return shape of `Transform::process_string`: a transform
/// may hand back bare bytes, or a structured result carrying custom
/// extras (e.g. a source map) alongside the output. Normalization to
/// `ProcessResult` happens once, at the `Processor` boundary, so the
/// engine and `post_process` only ever see the structured form.
#[derive(Debug, Clone)]
pub enum ProcessOutput {
    BytesOnly(Vec<u8>),
    Structured(ProcessResult),
}

impl ProcessOutput {
    pub fn into_result(self) -> ProcessResult {
        match self {
            ProcessOutput::BytesOnly(bytes) => ProcessResult::new(bytes),
            ProcessOutput::Structured(result) => result,
        }
    }
}

impl From<Vec<u8>> for ProcessOutput {
    fn from(bytes: Vec<u8>) -> Self {
        ProcessOutput::BytesOnly(bytes)
    }
}

impl From<ProcessResult> for ProcessOutput {
    fn from(result: ProcessResult) -> Self {
        ProcessOutput::Structured(result)
    }
}

/// The hook a host transform implements to plug into the engine.
///
/// This is the trait-based answer to the spec's "abstract base that
/// refuses direct use": the engine is generic over `Arc<dyn Transform>`,
/// so there is no way to construct a `Filter` without a concrete
/// `process_string` — `AbstractInstantiationError` and
/// `NotImplementedError` are compile-time impossible rather than
/// runtime checks.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Transform one file's contents. Mandatory.
    ///
    /// `deps` is the seam for declaring cross-file dependencies: call
    /// `deps.set_dependencies(relative_path, &[...])` before returning
    /// if this file's output depends on other files' contents. It is a
    /// `NullRecorder` when the engine was built with
    /// `dependency_invalidation: false`.
    async fn process_string(
        &self,
        contents: &[u8],
        relative_path: &str,
        deps: &dyn DependencyRecorder,
    ) -> SieveResult<ProcessOutput>;

    /// Optional post-processing hook, run after every `process_string`
    /// call AND after every cache hit (persistent or in-memory). Its
    /// return value is never written back into the cache.
    async fn post_process(&self, result: ProcessResult, _relative_path: &str) -> SieveResult<ProcessResult> {
        Ok(result)
    }

    /// A stable identity for this transform, used to derive the default
    /// `cache_key`. Analogous to the host package's class/subclass name
    /// in the source this spec distills.
    fn name(&self) -> &str {
        "transform"
    }

    /// The injected `hash_of_plugin_env()` collaborator: a host-provided
    /// fingerprint of the transform's own code/config, external to this
    /// crate. The default is stable-but-empty so a transform that
    /// doesn't override it still gets a deterministic (if coarse)
    /// `cache_key`.
    fn hash_of_plugin_env(&self) -> String {
        String::new()
    }

    /// Defaults to `hash_of_plugin_env()` composed with `name()`.
    fn cache_key(&self) -> String {
        fingerprint::compose_key(&[&self.hash_of_plugin_env(), self.name()])
    }

    /// Defaults to `md5(contents || NUL || relative_path)`.
    fn cache_key_process_string(&self, contents: &[u8], relative_path: &str) -> String {
        fingerprint::file_cache_key(contents, relative_path)
    }

    /// Mandatory when the engine is constructed with `persist: true`;
    /// `Filter::new` fails with `SieveError::UnimplementedBaseDir`
    /// otherwise.
    fn base_dir(&self) -> Option<PathBuf> {
        None
    }
}
