pub mod diff;
pub mod entry;
pub mod snapshot;
pub mod walker;

pub use diff::{dedup_patch, diff, Op, Patch, PatchOp};
pub use entry::{Entry, HashEntry, TreeItem};
pub use snapshot::Snapshot;
pub use walker::walk;
