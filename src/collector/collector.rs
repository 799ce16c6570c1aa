//! `/proc`-backed implementation of [`RawSource`].
//!
//! Combines the process and system readers with the user resolver behind the
//! typed interface the sampler consumes.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::collector::procfs::{
    CollectError, ProcessCollector, ProcessRaw, SystemCollector, ThreadRaw, UserResolver,
};
use crate::collector::traits::{FileSystem, RawSource};
use crate::model::{CpuTimes, LoadAverage};

/// Clock ticks per second (USER_HZ). Standard value for Linux.
pub const DEFAULT_CLOCK_HZ: u64 = 100;

/// Raw counter source reading from a proc filesystem.
pub struct ProcfsSource<F: FileSystem + Clone> {
    process_collector: ProcessCollector<F>,
    system_collector: SystemCollector<F>,
    user_resolver: UserResolver,
    clock_hz: u64,
}

impl<F: FileSystem + Clone> ProcfsSource<F> {
    /// Creates a new source.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `passwd_path` - Path to the passwd file used for user names
    pub fn new(fs: F, proc_path: impl Into<String>, passwd_path: impl AsRef<Path>) -> Self {
        let proc_path = proc_path.into();

        let mut user_resolver = UserResolver::new();
        match fs.read_to_string(passwd_path.as_ref()) {
            Ok(content) => {
                user_resolver.load_from_content(&content);
                if !user_resolver.is_loaded() {
                    debug!(
                        path = %passwd_path.as_ref().display(),
                        "passwd has no entries, user names will be numeric"
                    );
                }
            }
            Err(e) => debug!(
                path = %passwd_path.as_ref().display(),
                error = %e,
                "passwd unavailable, user names will be numeric"
            ),
        }

        Self {
            process_collector: ProcessCollector::new(fs.clone(), &proc_path),
            system_collector: SystemCollector::new(fs, &proc_path),
            user_resolver,
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }

    /// Overrides the clock tick rate (USER_HZ).
    pub fn with_clock_hz(mut self, clock_hz: u64) -> Self {
        self.clock_hz = clock_hz;
        self
    }
}

impl<F: FileSystem + Clone> RawSource for ProcfsSource<F> {
    fn read_global_jiffies(&self) -> Result<CpuTimes, CollectError> {
        self.system_collector
            .collect_cpu_stat()?
            .total
            .ok_or_else(|| CollectError::parse("/proc/stat", "", "missing aggregate cpu line"))
    }

    fn read_per_core_jiffies(&self) -> Result<Vec<CpuTimes>, CollectError> {
        Ok(self.system_collector.collect_cpu_stat()?.cores)
    }

    fn read_mem_fields(&self) -> Result<HashMap<String, u64>, CollectError> {
        self.system_collector.collect_meminfo()
    }

    fn read_uptime_seconds(&self) -> Result<f64, CollectError> {
        self.system_collector.collect_uptime()
    }

    fn read_load_average(&self) -> Result<LoadAverage, CollectError> {
        self.system_collector.collect_loadavg()
    }

    fn list_process_ids(&self) -> Result<Vec<u32>, CollectError> {
        self.process_collector.list_pids()
    }

    fn read_process_raw(&self, pid: u32) -> Result<ProcessRaw, CollectError> {
        self.process_collector.collect_process(pid)
    }

    fn list_threads(&self, pid: u32) -> Vec<ThreadRaw> {
        self.process_collector.collect_threads(pid)
    }

    fn resolve_username(&self, uid: u32) -> String {
        self.user_resolver.resolve(uid)
    }

    fn clock_hz(&self) -> u64 {
        self.clock_hz
    }
}
