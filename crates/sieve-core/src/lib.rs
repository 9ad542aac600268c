pub mod cli;
pub mod error;
pub mod fingerprint;
pub mod recorder;

pub use cli::{parse_args, Args};
pub use error::{SieveError, SieveResult};
pub use recorder::{DependencyRecorder, NullRecorder};
