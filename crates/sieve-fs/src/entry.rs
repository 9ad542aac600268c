use serde::{Deserialize, Serialize};

/// A single filesystem item visible in the input tree.
///
/// Directory entries carry a trailing `/` in `relative_path`; this is
/// the sole source of truth for `is_directory`, since it is what makes
/// lexicographic sorting place a directory immediately before its
/// children (a `/` byte sorts below every path-segment character).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub relative_path: String,
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    pub mtime: i64,
    pub mode: u32,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        self.relative_path.ends_with('/')
    }
}

/// A dependency-tracking variant of `Entry` used for files inside the
/// plugin's own input tree: stat fields are replaced by a content hash,
/// since in-tree dependencies are rewritten many times per build with
/// identical bytes (host copy steps) and stat-diffing would false-trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashEntry {
    pub relative_path: String,
    pub hash: String,
}

impl HashEntry {
    pub fn is_directory(&self) -> bool {
        self.relative_path.ends_with('/')
    }

    pub fn missing(relative_path: impl Into<String>) -> Self {
        HashEntry {
            relative_path: relative_path.into(),
            hash: String::new(),
        }
    }
}

/// A type usable as the element of a `Snapshot`.
///
/// `differs_from` encodes rule 4 of the diff spec: for `Entry`, files
/// differ by mtime/size and anything differs by mode; for `HashEntry`,
/// equality is purely by content hash.
pub trait TreeItem: Clone {
    fn relative_path(&self) -> &str;
    fn is_directory(&self) -> bool;
    fn differs_from(&self, other: &Self) -> bool;
}

impl TreeItem for Entry {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn is_directory(&self) -> bool {
        Entry::is_directory(self)
    }

    fn differs_from(&self, other: &Self) -> bool {
        if self.mode != other.mode {
            return true;
        }
        if self.is_directory() {
            return false;
        }
        self.mtime != other.mtime || self.size != other.size
    }
}

impl TreeItem for HashEntry {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn is_directory(&self) -> bool {
        HashEntry::is_directory(self)
    }

    fn differs_from(&self, other: &Self) -> bool {
        self.hash != other.hash
    }
}
