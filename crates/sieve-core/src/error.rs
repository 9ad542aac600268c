use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The error type shared by every `sieve-*` crate.
///
/// Mirrors the split the teacher's own workspace draws between a typed
/// library error (`thiserror`) and the `anyhow::Error` its binaries use at
/// the process boundary: `Transform` wraps arbitrary host failures in
/// `anyhow::Error` rather than inventing a second error hierarchy.
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("dependency serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("persistent cache serialization error: {0}")]
    CacheSerialization(#[from] bincode::Error),

    #[error("transform declares persist=true but Transform::base_dir() returned None")]
    UnimplementedBaseDir,

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("transform failed on {file} (tree root {tree_dir}): {source}")]
    Transform {
        file: String,
        tree_dir: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("lock timeout: {0}")]
    LockTimeout(String),
}

pub type SieveResult<T> = Result<T, SieveError>;
