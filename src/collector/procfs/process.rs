//! Process reader for gathering per-process data from `/proc/[pid]/`.

use std::io;
use std::path::Path;

use tracing::trace;

use crate::collector::procfs::parser::{
    parse_cmdline, parse_proc_stat, parse_proc_status, parse_stat_state,
};
use crate::collector::traits::FileSystem;
use crate::model::{MemoryBreakdown, ProcessState};

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// Process disappeared during collection.
    ProcessGone(u32),
    /// I/O error reading a `/proc` file.
    Io(std::io::Error),
    /// Unexpected content in a `/proc` file.
    Parse {
        /// Which file (and PID) the content came from.
        context: String,
        /// The offending raw content.
        raw: String,
        message: String,
    },
}

impl CollectError {
    pub(crate) fn parse(context: impl Into<String>, raw: &str, message: impl Into<String>) -> Self {
        CollectError::Parse {
            context: context.into(),
            raw: raw.trim().to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse {
                context,
                raw,
                message,
            } => write!(f, "parse error in {}: {} (raw: '{}')", context, message, raw),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// `errno` the kernel returns when reading files of a process being reaped.
const ESRCH: i32 = 3;

/// Raw, not yet derived data of one process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRaw {
    pub pid: u32,
    pub comm: String,
    /// Normalized command line, `[comm]` for kernel threads.
    pub cmdline: String,
    pub state: ProcessState,
    pub ppid: u32,
    pub uid: u32,
    pub utime: u64,
    pub stime: u64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: u64,
    pub starttime: u64,
    pub memory: MemoryBreakdown,
}

/// Raw data of one thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRaw {
    pub tid: u32,
    pub state: ProcessState,
    pub name: String,
}

/// Reads process information from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
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

    /// Lists PIDs from the numeric entries of the proc directory.
    pub fn list_pids(&self) -> Result<Vec<u32>, CollectError> {
        let entries = self.fs.read_dir(Path::new(&self.proc_path))?;
        Ok(entries
            .iter()
            .filter_map(|entry| entry.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| name.parse::<u32>().ok())
            .collect())
    }

    /// Reads one file of `/proc/[pid]/`.
    ///
    /// `NotFound`, `ESRCH` or a vanished process directory mean the process
    /// exited. Any other failure is reported as `CollectError::Io`.
    fn read_process_file(&self, pid: u32, proc_dir: &str, path: &str) -> Result<String, CollectError> {
        self.fs.read_to_string(Path::new(path)).map_err(|e| {
            let gone = e.kind() == io::ErrorKind::NotFound
                || e.raw_os_error() == Some(ESRCH)
                || !self.fs.exists(Path::new(proc_dir));
            if gone {
                CollectError::ProcessGone(pid)
            } else {
                CollectError::Io(e)
            }
        })
    }

    /// Reads a single process.
    ///
    /// A missing `stat` or `status` file means the process exited and yields
    /// `CollectError::ProcessGone`. Other read failures, such as permission
    /// errors, yield `CollectError::Io`.
    pub fn collect_process(&self, pid: u32) -> Result<ProcessRaw, CollectError> {
        let proc_dir = format!("{}/{}", self.proc_path, pid);

        let stat_path = format!("{}/stat", proc_dir);
        let stat_content = self.read_process_file(pid, &proc_dir, &stat_path)?;
        let stat = parse_proc_stat(&stat_content)
            .map_err(|e| CollectError::parse(&stat_path, &stat_content, e.message))?;

        let status_path = format!("{}/status", proc_dir);
        let status_content = self.read_process_file(pid, &proc_dir, &status_path)?;
        let status = parse_proc_status(&status_content)
            .map_err(|e| CollectError::parse(&status_path, &status_content, e.message))?;

        // Kernel threads have an empty cmdline
        let cmdline_path = format!("{}/cmdline", proc_dir);
        let cmdline = self
            .fs
            .read_to_string(Path::new(&cmdline_path))
            .map(|content| parse_cmdline(&content))
            .unwrap_or_default();
        let cmdline = if cmdline.is_empty() {
            format!("[{}]", stat.comm)
        } else {
            cmdline
        };

        Ok(ProcessRaw {
            pid: stat.pid,
            comm: stat.comm,
            cmdline,
            state: ProcessState::from_letter(stat.state),
            ppid: stat.ppid,
            uid: status.uid,
            utime: stat.utime,
            stime: stat.stime,
            priority: stat.priority,
            nice: stat.nice,
            num_threads: stat.num_threads,
            starttime: stat.starttime,
            memory: MemoryBreakdown {
                virtual_kb: status.vm_size,
                virtual_peak_kb: status.vm_peak,
                resident_kb: status.vm_rss,
                resident_peak_kb: status.vm_hwm,
                resident_anon_kb: status.rss_anon,
                resident_file_kb: status.rss_file,
                resident_shared_kb: status.rss_shmem,
                data_kb: status.vm_data,
                stack_kb: status.vm_stk,
                code_kb: status.vm_exe,
                shared_lib_kb: status.vm_lib,
                swapped_kb: status.vm_swap,
                page_table_kb: status.vm_pte,
                locked_kb: status.vm_lck,
                pinned_kb: status.vm_pin,
            },
        })
    }

    /// Reads all threads of a process from `/proc/[pid]/task/`.
    ///
    /// Threads that exit while being read are skipped. A thread whose name
    /// cannot be read is reported as `tid_<tid>`.
    pub fn collect_threads(&self, pid: u32) -> Vec<ThreadRaw> {
        let task_dir = format!("{}/{}/task", self.proc_path, pid);
        let entries = match self.fs.read_dir(Path::new(&task_dir)) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(pid, error = %e, "task directory unavailable");
                return Vec::new();
            }
        };

        let mut tids: Vec<u32> = entries
            .iter()
            .filter_map(|entry| entry.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| name.parse::<u32>().ok())
            .collect();
        tids.sort_unstable();

        let mut threads = Vec::with_capacity(tids.len());
        for tid in tids {
            let stat_path = format!("{}/{}/stat", task_dir, tid);
            let Ok(stat_content) = self.fs.read_to_string(Path::new(&stat_path)) else {
                trace!(pid, tid, "thread exited during collection");
                continue;
            };
            let state = parse_stat_state(&stat_content)
                .map(ProcessState::from_letter)
                .unwrap_or(ProcessState::Other('?'));

            let comm_path = format!("{}/{}/comm", task_dir, tid);
            let name = self
                .fs
                .read_to_string(Path::new(&comm_path))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| format!("tid_{}", tid));

            threads.push(ThreadRaw { tid, state, name });
        }

        threads
    }
}
