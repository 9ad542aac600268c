pub mod dependencies;
pub mod shared;

pub use dependencies::{Dependencies, FsRoot};
pub use shared::SharedDependencies;
