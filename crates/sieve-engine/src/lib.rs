pub mod engine;
pub mod options;
pub mod report;

pub use engine::Engine;
pub use options::{Encoding, FilterOptions};
pub use report::BuildReport;
