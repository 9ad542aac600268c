use serde::{Deserialize, Serialize};

/// The full structured result of transforming one file.
///
/// The cache stores this whole value, not just `output`, so that a
/// `post_process` hook can run even on a persistent-cache hit (it may
/// need the transform's custom extras, e.g. a source map).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub output: Vec<u8>,
    #[serde(default)]
    pub extras: serde_json::Value,
}

impl ProcessResult {
    pub fn new(output: Vec<u8>) -> Self {
        ProcessResult { output, extras: serde_json::Value::Null }
    }
}
