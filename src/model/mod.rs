//! Data model shared by the sampler, the snapshot store and consumers.

mod process;
mod snapshot;
mod system;

pub use process::{MemoryBreakdown, ProcessSample, ProcessState, ThreadSample};
pub use snapshot::Snapshot;
pub use system::{CpuTimes, GlobalSample, LoadAverage};
