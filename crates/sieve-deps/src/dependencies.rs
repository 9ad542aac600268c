use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sieve_core::fingerprint;
use sieve_core::{SieveError, SieveResult};
use sieve_fs::{diff, Entry, HashEntry, Snapshot};

/// The two filesystem roots a `Dependencies` instance tracks: the
/// plugin's own input tree (hashed, since it gets copied/rewritten with
/// identical content many times per build) and everything else
/// (stat'd, since it's cheap and rarely changes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsRoot {
    Local,
    External,
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Per-file declared cross-file dependencies, with reverse-index
/// invalidation.
///
/// Lifecycle: a transform calls `set_dependencies` while the instance is
/// unsealed (during a build). Once the build finishes, the engine calls
/// `seal` and `capture_dependency_state`. The next build calls
/// `get_invalidated_files`, then `copy_without` to start a fresh
/// unsealed instance for the files that are about to be reprocessed.
#[derive(Debug, Clone)]
pub struct Dependencies {
    root_dir: PathBuf,
    dependency_map: HashMap<String, Vec<PathBuf>>,
    dependents_map: HashMap<PathBuf, Vec<String>>,
    all_deps_by_fs_root: HashMap<FsRoot, BTreeSet<String>>,
    local_tree: Snapshot<HashEntry>,
    external_tree: Snapshot<Entry>,
    sealed: bool,
}

impl Dependencies {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Dependencies {
            root_dir: root_dir.into(),
            dependency_map: HashMap::new(),
            dependents_map: HashMap::new(),
            all_deps_by_fs_root: HashMap::new(),
            local_tree: Snapshot::empty(),
            external_tree: Snapshot::empty(),
            sealed: false,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Declare that `relative_path` depends on `deps`. Relative entries
    /// in `deps` are resolved against the *directory of the declaring
    /// file* inside `root_dir` (the earlier, documented generation's
    /// behavior — see DESIGN.md for why this spec keeps it).
    pub fn set_dependencies(&mut self, relative_path: &str, deps: &[PathBuf]) -> SieveResult<()> {
        if self.sealed {
            return Err(SieveError::Invariant(format!(
                "set_dependencies called on sealed Dependencies for {relative_path}"
            )));
        }

        let declaring_dir = Path::new(relative_path)
            .parent()
            .map(|p| self.root_dir.join(p))
            .unwrap_or_else(|| self.root_dir.clone());

        let resolved: Vec<PathBuf> = deps
            .iter()
            .map(|d| {
                if d.is_absolute() {
                    d.clone()
                } else {
                    declaring_dir.join(d)
                }
            })
            .collect();

        self.dependency_map.insert(relative_path.to_string(), resolved);
        Ok(())
    }

    /// One-shot; safe to call more than once.
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }
        self.dependents_map.clear();
        self.all_deps_by_fs_root.clear();
        self.all_deps_by_fs_root.insert(FsRoot::Local, BTreeSet::new());
        self.all_deps_by_fs_root.insert(FsRoot::External, BTreeSet::new());

        for (owner, deps) in &self.dependency_map {
            for dep in deps {
                let (root, key) = self.classify(dep);
                self.all_deps_by_fs_root.get_mut(&root).unwrap().insert(key);
                self.dependents_map
                    .entry(dep.clone())
                    .or_default()
                    .push(owner.clone());
            }
        }
        self.sealed = true;
    }

    fn classify(&self, abs: &Path) -> (FsRoot, String) {
        match abs.strip_prefix(&self.root_dir) {
            Ok(rel) => (FsRoot::Local, to_slash(rel)),
            Err(_) => (FsRoot::External, to_slash(abs)),
        }
    }

    /// Build and store the baseline trees from the current
    /// `all_deps_by_fs_root`. Call after `seal`.
    pub fn capture_dependency_state(&mut self) {
        self.local_tree = self.build_local_tree();
        self.external_tree = self.build_external_tree();
    }

    fn build_local_tree(&self) -> Snapshot<HashEntry> {
        let empty = BTreeSet::new();
        let paths = self.all_deps_by_fs_root.get(&FsRoot::Local).unwrap_or(&empty);
        let entries = paths
            .iter()
            .map(|rel| {
                let abs = self.root_dir.join(rel);
                match fs::read(&abs) {
                    Ok(bytes) => HashEntry {
                        relative_path: rel.clone(),
                        hash: fingerprint::hash_bytes(&bytes),
                    },
                    Err(_) => HashEntry::missing(rel.clone()),
                }
            })
            .collect();
        Snapshot::from_entries(entries)
    }

    fn build_external_tree(&self) -> Snapshot<Entry> {
        let empty = BTreeSet::new();
        let paths = self.all_deps_by_fs_root.get(&FsRoot::External).unwrap_or(&empty);
        let entries = paths
            .iter()
            .map(|abs_str| match fs::metadata(abs_str) {
                Ok(meta) => Entry {
                    relative_path: abs_str.clone(),
                    size: meta.len(),
                    mtime: meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| d.as_millis() as i64)
                        .unwrap_or(0),
                    mode: 0,
                },
                Err(_) => Entry {
                    relative_path: abs_str.clone(),
                    size: 0,
                    mtime: 0,
                    mode: 0,
                },
            })
            .collect();
        Snapshot::from_entries(entries)
    }

    /// Recompute current dependency state, diff it against the captured
    /// baseline, and return the relative paths of every file whose
    /// declared dependencies changed. Atomically adopts the recomputed
    /// state as the new baseline.
    pub fn get_invalidated_files(&mut self) -> Vec<String> {
        let current_local = self.build_local_tree();
        let current_external = self.build_external_tree();

        let mut changed_abs: Vec<PathBuf> = Vec::new();

        for op in diff::diff(&self.local_tree, &current_local) {
            changed_abs.push(self.root_dir.join(&op.relative_path));
        }
        for op in diff::diff(&self.external_tree, &current_external) {
            changed_abs.push(PathBuf::from(&op.relative_path));
        }

        self.local_tree = current_local;
        self.external_tree = current_external;

        let mut invalidated: BTreeSet<String> = BTreeSet::new();
        for abs in &changed_abs {
            if let Some(owners) = self.dependents_map.get(abs) {
                invalidated.extend(owners.iter().cloned());
            }
        }
        invalidated.into_iter().collect()
    }

    /// A fresh, unsealed instance carrying every declaration except the
    /// ones for `files`; the captured baseline trees carry over
    /// unchanged. Used when a build's patch list contains `unlink` for
    /// a file that other files declared a dependency on.
    pub fn copy_without(&self, files: &[String]) -> Dependencies {
        let exclude: BTreeSet<&str> = files.iter().map(|s| s.as_str()).collect();
        let dependency_map = self
            .dependency_map
            .iter()
            .filter(|(k, _)| !exclude.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Dependencies {
            root_dir: self.root_dir.clone(),
            dependency_map,
            dependents_map: HashMap::new(),
            all_deps_by_fs_root: HashMap::new(),
            local_tree: self.local_tree.clone(),
            external_tree: self.external_tree.clone(),
            sealed: false,
        }
    }

    pub fn serialize(&self) -> SieveResult<String> {
        let doc = SerializedDependencies::from(self);
        Ok(serde_json::to_string(&doc)?)
    }

    /// `new_root_dir` rebases every stored absolute path that started
    /// under the serialized `rootDir` onto the new root.
    pub fn deserialize(json: &str, new_root_dir: Option<&Path>) -> SieveResult<Dependencies> {
        let doc: SerializedDependencies = serde_json::from_str(json)?;
        Ok(doc.into_dependencies(new_root_dir))
    }
}

#[derive(Serialize, Deserialize)]
struct SerializedFsTree {
    fs_root: FsRoot,
    entries: Vec<SerializedEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum SerializedEntry {
    #[serde(rename = "stat")]
    Stat {
        #[serde(rename = "relativePath")]
        relative_path: String,
        size: u64,
        mtime: i64,
        mode: u32,
    },
    #[serde(rename = "hash")]
    Hash {
        #[serde(rename = "relativePath")]
        relative_path: String,
        hash: String,
    },
}

#[derive(Serialize, Deserialize)]
struct SerializedDependencies {
    #[serde(rename = "rootDir")]
    root_dir: String,
    dependencies: HashMap<String, Vec<String>>,
    #[serde(rename = "fsTrees")]
    fs_trees: Vec<SerializedFsTree>,
}

impl From<&Dependencies> for SerializedDependencies {
    fn from(deps: &Dependencies) -> Self {
        let dependencies = deps
            .dependency_map
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().map(|p| to_slash(p)).collect()))
            .collect();

        let local_entries = deps
            .local_tree
            .entries()
            .iter()
            .map(|e| SerializedEntry::Hash {
                relative_path: e.relative_path.clone(),
                hash: e.hash.clone(),
            })
            .collect();
        let external_entries = deps
            .external_tree
            .entries()
            .iter()
            .map(|e| SerializedEntry::Stat {
                relative_path: e.relative_path.clone(),
                size: e.size,
                mtime: e.mtime,
                mode: e.mode,
            })
            .collect();

        SerializedDependencies {
            root_dir: to_slash(&deps.root_dir),
            dependencies,
            fs_trees: vec![
                SerializedFsTree { fs_root: FsRoot::Local, entries: local_entries },
                SerializedFsTree { fs_root: FsRoot::External, entries: external_entries },
            ],
        }
    }
}

impl SerializedDependencies {
    fn into_dependencies(self, new_root_dir: Option<&Path>) -> Dependencies {
        let old_root = PathBuf::from(&self.root_dir);
        let root_dir = new_root_dir.map(Path::to_path_buf).unwrap_or_else(|| old_root.clone());

        let rebase = |p: &str| -> PathBuf {
            let p = PathBuf::from(p);
            if new_root_dir.is_some() {
                if let Ok(rel) = p.strip_prefix(&old_root) {
                    return root_dir.join(rel);
                }
            }
            p
        };

        let dependency_map = self
            .dependencies
            .into_iter()
            .map(|(k, v)| (k, v.iter().map(|p| rebase(p)).collect()))
            .collect();

        let mut local_entries = Vec::new();
        let mut external_entries = Vec::new();
        for tree in self.fs_trees {
            match tree.fs_root {
                FsRoot::Local => {
                    for e in tree.entries {
                        if let SerializedEntry::Hash { relative_path, hash } = e {
                            local_entries.push(HashEntry { relative_path, hash });
                        }
                    }
                }
                FsRoot::External => {
                    for e in tree.entries {
                        if let SerializedEntry::Stat { relative_path, size, mtime, mode } = e {
                            external_entries.push(Entry {
                                relative_path: to_slash(&rebase(&relative_path)),
                                size,
                                mtime,
                                mode,
                            });
                        }
                    }
                }
            }
        }

        let mut deps = Dependencies::new(root_dir);
        deps.dependency_map = dependency_map;
        deps.local_tree = Snapshot::from_entries(local_entries);
        deps.external_tree = Snapshot::from_entries(external_entries);
        deps.seal();
        deps
    }
}
