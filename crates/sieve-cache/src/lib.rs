pub mod memory;
pub mod persistent;
pub mod result;

pub use memory::{Cache, CacheLookup};
pub use persistent::{default_persistent_cache_root, persistence_enabled, PersistentCache};
pub use result::ProcessResult;
