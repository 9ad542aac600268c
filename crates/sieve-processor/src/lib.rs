pub mod instrumentation;
pub mod processor;
pub mod transform;

pub use instrumentation::{Counters, InstrumentationSink, NullSink};
pub use processor::{Processor, ProcessorStrategy};
pub use transform::{ProcessOutput, Transform};
