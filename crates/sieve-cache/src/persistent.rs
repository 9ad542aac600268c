use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::result::ProcessResult;

/// Resolve the disk-backed cache root: `PERSISTENT_FILTER_CACHE_ROOT` if
/// set, otherwise a `sieve-cache` directory under the system temp dir.
pub fn default_persistent_cache_root() -> PathBuf {
    std::env::var("PERSISTENT_FILTER_CACHE_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("sieve-cache"))
}

/// Whether the persistent layer should be constructed at all: the
/// caller must opt in, and the process must not look like CI unless
/// `FORCE_PERSISTENCE_IN_CI` overrides the gate.
pub fn persistence_enabled(persist_requested: bool) -> bool {
    if !persist_requested {
        return false;
    }
    let in_ci = std::env::var("CI").map(|v| is_truthy(&v)).unwrap_or(false);
    let forced = std::env::var("FORCE_PERSISTENCE_IN_CI").map(|v| is_truthy(&v)).unwrap_or(false);
    !in_ci || forced
}

fn is_truthy(v: &str) -> bool {
    !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
}

type Index = HashMap<String, (u64, u64)>;

/// A single namespace's on-disk store: an index file mapping cache key
/// to a byte range in an append-only data file, mirroring the
/// index/data split the teacher's own tree cache uses. The index file
/// is always replaced via write-to-temp-then-rename, so a reader never
/// observes a torn index.
struct NamespaceStore {
    dir: PathBuf,
}

impl NamespaceStore {
    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn data_path(&self) -> PathBuf {
        self.dir.join("data.bin")
    }

    fn load_index(&self) -> Index {
        fs::read_to_string(self.index_path())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        let index = self.load_index();
        let Some(&(offset, len)) = index.get(key) else {
            return Ok(None);
        };
        let mut file = File::open(self.data_path())?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut index = self.load_index();
        let mut data_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.data_path())?;
        let offset = data_file.metadata()?.len();
        data_file.write_all(value)?;
        index.insert(key.to_string(), (offset, value.len() as u64));

        let tmp = self.dir.join("index.json.tmp");
        fs::write(&tmp, serde_json::to_vec(&index).unwrap_or_default())?;
        fs::rename(&tmp, self.index_path())?;
        Ok(())
    }
}

/// The disk-backed, `zstd`-compressed, `bincode`-serialized layer of
/// the two-level cache, namespaced by `plugin_cache_key`.
pub struct PersistentCache {
    store: NamespaceStore,
}

impl PersistentCache {
    pub fn new(root: impl Into<PathBuf>, plugin_cache_key: &str) -> Self {
        PersistentCache {
            store: NamespaceStore { dir: root.into().join(plugin_cache_key) },
        }
    }

    /// Never fails observably: I/O and decode errors are logged and
    /// demoted to a cache miss.
    pub fn get(&self, key: &str) -> Option<ProcessResult> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("persistent cache read failed for {key}: {err}");
                return None;
            }
        };
        let decompressed = match zstd::decode_all(&raw[..]) {
            Ok(d) => d,
            Err(err) => {
                log::warn!("persistent cache decompression failed for {key}: {err}");
                return None;
            }
        };
        match bincode::deserialize(&decompressed) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("persistent cache decode failed for {key}: {err}");
                None
            }
        }
    }

    /// Fire-and-forget: failures are logged, never propagated.
    pub fn set(&self, key: &str, value: &ProcessResult) {
        if let Err(err) = self.try_set(key, value) {
            log::warn!("persistent cache write failed for {key}: {err}");
        }
    }

    fn try_set(&self, key: &str, value: &ProcessResult) -> anyhow::Result<()> {
        let encoded = bincode::serialize(value)?;
        let compressed = zstd::encode_all(&encoded[..], 0)?;
        self.store.set(key, &compressed)?;
        Ok(())
    }
}
