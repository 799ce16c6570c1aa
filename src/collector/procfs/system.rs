//! System reader for gathering global counters from `/proc/`.

use std::collections::HashMap;
use std::path::Path;

use crate::collector::procfs::parser::{
    CpuStat, parse_cpu_stat, parse_loadavg, parse_meminfo, parse_uptime,
};
use crate::collector::procfs::process::CollectError;
use crate::collector::traits::FileSystem;
use crate::model::LoadAverage;

/// Reads system-wide counters from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read(&self, name: &str) -> Result<(String, String), CollectError> {
        let path = format!("{}/{}", self.proc_path, name);
        let content = self.fs.read_to_string(Path::new(&path))?;
        Ok((path, content))
    }

    /// Collects the CPU lines of `/proc/stat`.
    pub fn collect_cpu_stat(&self) -> Result<CpuStat, CollectError> {
        let (path, content) = self.read("stat")?;
        parse_cpu_stat(&content).map_err(|e| CollectError::parse(path, &content, e.message))
    }

    /// Collects all KB-valued fields of `/proc/meminfo`.
    pub fn collect_meminfo(&self) -> Result<HashMap<String, u64>, CollectError> {
        let (_, content) = self.read("meminfo")?;
        Ok(parse_meminfo(&content))
    }

    /// Collects seconds since boot from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<f64, CollectError> {
        let (path, content) = self.read("uptime")?;
        parse_uptime(&content).map_err(|e| CollectError::parse(path, &content, e.message))
    }

    /// Collects load averages from `/proc/loadavg`.
    pub fn collect_loadavg(&self) -> Result<LoadAverage, CollectError> {
        let (path, content) = self.read("loadavg")?;
        parse_loadavg(&content).map_err(|e| CollectError::parse(path, &content, e.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_collect_cpu_stat() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        let stat = collector.collect_cpu_stat().unwrap();
        assert_eq!(stat.total.unwrap().user, 10000);
        assert_eq!(stat.cores.len(), 4);
    }

    #[test]
    fn test_collect_meminfo() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        let mem = collector.collect_meminfo().unwrap();
        assert_eq!(mem["MemTotal"], 16384000);
        assert_eq!(mem["SwapFree"], 3072000);
    }

    #[test]
    fn test_collect_uptime_and_loadavg() {
        let collector = SystemCollector::new(MockFs::typical_system(), "/proc");
        assert_eq!(collector.collect_uptime().unwrap(), 12345.67);
        assert_eq!(collector.collect_loadavg().unwrap().one, 0.15);
    }

    #[test]
    fn test_missing_files_are_io_errors() {
        let collector = SystemCollector::new(MockFs::new(), "/proc");
        assert!(matches!(collector.collect_cpu_stat(), Err(CollectError::Io(_))));
        assert!(matches!(collector.collect_meminfo(), Err(CollectError::Io(_))));
        assert!(matches!(collector.collect_uptime(), Err(CollectError::Io(_))));
        assert!(matches!(collector.collect_loadavg(), Err(CollectError::Io(_))));
    }

    #[test]
    fn test_malformed_loadavg_reports_path() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/loadavg", "garbage\n");
        let collector = SystemCollector::new(fs, "/proc");

        match collector.collect_loadavg() {
            Err(CollectError::Parse { context, raw, .. }) => {
                assert_eq!(context, "/proc/loadavg");
                assert_eq!(raw, "garbage");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
