//! Abstractions for filesystem access and raw counter reading.
//!
//! The `FileSystem` trait allows the readers to work with both the real `/proc`
//! filesystem on Linux and in-memory mocks in tests. `RawSource` is the typed
//! interface the sampler consumes; it knows nothing about text formats.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::collector::procfs::{CollectError, ProcessRaw, ThreadRaw};
use crate::model::{CpuTimes, LoadAverage};

/// Abstraction for filesystem operations.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    ///
    /// Returns full paths of the direct children, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        // cmdline may contain arbitrary bytes
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

/// Typed access to the kernel counters a collection pass needs.
///
/// Implementations are stateless from the sampler's point of view: every call
/// reads the current value. A failed read is reported as an error and the
/// caller decides which default to use.
pub trait RawSource: Send + Sync {
    /// Aggregate `cpu` line.
    fn read_global_jiffies(&self) -> Result<CpuTimes, CollectError>;

    /// `cpuN` lines in core order.
    fn read_per_core_jiffies(&self) -> Result<Vec<CpuTimes>, CollectError>;

    /// KB-valued memory fields keyed by name (`MemTotal`, `SwapFree`, ...).
    fn read_mem_fields(&self) -> Result<HashMap<String, u64>, CollectError>;

    fn read_uptime_seconds(&self) -> Result<f64, CollectError>;

    fn read_load_average(&self) -> Result<LoadAverage, CollectError>;

    /// PIDs currently visible. Order is unspecified.
    fn list_process_ids(&self) -> Result<Vec<u32>, CollectError>;

    /// Reads one process. `CollectError::ProcessGone` means the process
    /// exited after it was listed.
    fn read_process_raw(&self, pid: u32) -> Result<ProcessRaw, CollectError>;

    /// Threads of one process. A vanished process yields an empty list.
    fn list_threads(&self, pid: u32) -> Vec<ThreadRaw>;

    /// UID to user name; unknown UIDs render as the number.
    fn resolve_username(&self, uid: u32) -> String;

    /// Clock ticks per second of the jiffies counters.
    fn clock_hz(&self) -> u64;
}
