use std::collections::HashMap;

use parking_lot::Mutex;

use crate::persistent::PersistentCache;
use crate::result::ProcessResult;

/// The outcome of a `Cache::get`: whether the key was found, and at
/// which layer, along with the cached value.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub cached: bool,
    pub value: Option<ProcessResult>,
}

impl CacheLookup {
    fn miss() -> Self {
        CacheLookup { cached: false, value: None }
    }

    fn hit(value: ProcessResult) -> Self {
        CacheLookup { cached: true, value: Some(value) }
    }
}

/// The two-level cache: an in-memory map kept for the lifetime of one
/// `Cache` (i.e. one build), backed optionally by a disk-persistent
/// layer that survives across process restarts.
///
/// Lookups always check the in-memory layer first; a persistent-layer
/// hit is promoted into the in-memory layer so a second lookup within
/// the same build never touches disk again.
pub struct Cache {
    memory: Mutex<HashMap<String, ProcessResult>>,
    persistent: Option<PersistentCache>,
}

impl Cache {
    pub fn new(persistent: Option<PersistentCache>) -> Self {
        Cache { memory: Mutex::new(HashMap::new()), persistent }
    }

    pub fn memoryless() -> Self {
        Cache::new(None)
    }

    pub fn has_persistent_layer(&self) -> bool {
        self.persistent.is_some()
    }

    pub fn get(&self, key: &str) -> CacheLookup {
        if let Some(value) = self.memory.lock().get(key).cloned() {
            return CacheLookup::hit(value);
        }
        let Some(persistent) = &self.persistent else {
            return CacheLookup::miss();
        };
        match persistent.get(key) {
            Some(value) => {
                self.memory.lock().insert(key.to_string(), value.clone());
                CacheLookup::hit(value)
            }
            None => CacheLookup::miss(),
        }
    }

    pub fn set(&self, key: &str, value: ProcessResult) {
        self.memory.lock().insert(key.to_string(), value.clone());
        if let Some(persistent) = &self.persistent {
            persistent.set(key, &value);
        }
    }
}
