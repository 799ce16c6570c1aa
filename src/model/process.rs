//! Per-process and per-thread metrics gathered from `/proc/[pid]/`.

use serde::{Deserialize, Serialize};

/// Scheduler state of a process or thread.
///
/// Source: `/proc/[pid]/stat` field 3 (state letter)
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ProcessState {
    /// `R`
    Running,
    /// `S`
    #[default]
    Sleeping,
    /// `D` (uninterruptible sleep, usually I/O)
    DiskWait,
    /// `Z`
    Zombie,
    /// `T` (job control) or `t` (traced)
    Stopped,
    /// Any other letter (`I` idle kernel thread, `X` dead, `P` parked, ...).
    Other(char),
}

impl ProcessState {
    /// Maps a kernel state letter to a state.
    pub fn from_letter(letter: char) -> Self {
        match letter {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskWait,
            'Z' => ProcessState::Zombie,
            'T' | 't' => ProcessState::Stopped,
            other => ProcessState::Other(other),
        }
    }

    /// Kernel letter for display.
    pub fn letter(&self) -> char {
        match self {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::DiskWait => 'D',
            ProcessState::Zombie => 'Z',
            ProcessState::Stopped => 'T',
            ProcessState::Other(c) => *c,
        }
    }
}

/// Memory breakdown of a single process.
///
/// Source: `/proc/[pid]/status`. All values are in kilobytes.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct MemoryBreakdown {
    /// VmSize
    pub virtual_kb: u64,
    /// VmPeak
    pub virtual_peak_kb: u64,
    /// VmRSS
    pub resident_kb: u64,
    /// VmHWM (peak resident set)
    pub resident_peak_kb: u64,
    /// RssAnon
    pub resident_anon_kb: u64,
    /// RssFile
    pub resident_file_kb: u64,
    /// RssShmem
    pub resident_shared_kb: u64,
    /// VmData
    pub data_kb: u64,
    /// VmStk
    pub stack_kb: u64,
    /// VmExe
    pub code_kb: u64,
    /// VmLib
    pub shared_lib_kb: u64,
    /// VmSwap
    pub swapped_kb: u64,
    /// VmPTE
    pub page_table_kb: u64,
    /// VmLck
    pub locked_kb: u64,
    /// VmPin
    pub pinned_kb: u64,
}

/// One thread of a process.
///
/// Source: `/proc/[pid]/task/[tid]/stat` and `/proc/[pid]/task/[tid]/comm`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ThreadSample {
    /// Thread ID, unique within the owning process.
    pub tid: u32,
    pub owning_pid: u32,
    pub state: ProcessState,
    pub name: String,
}

/// One process as seen by a single collection pass.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ProcessSample {
    /// Unique within one snapshot.
    pub pid: u32,
    /// Command name from `/proc/[pid]/stat` (between the parentheses).
    pub command_name: String,
    /// Full command line, `[command_name]` for kernel threads.
    pub command_line: String,
    pub state: ProcessState,
    pub parent_pid: u32,
    /// Real UID from `/proc/[pid]/status`.
    pub uid: u32,
    /// Resolved user name, or the numeric UID when unknown.
    pub owner_user: String,
    pub priority: i64,
    pub nice: i64,

    /// Cumulative user-mode time (jiffies).
    pub user_time_ticks: u64,
    /// Cumulative kernel-mode time (jiffies).
    pub kernel_time_ticks: u64,
    /// Start time in jiffies after boot.
    pub start_time_ticks: u64,
    pub thread_count: u64,

    /// CPU usage since the previous pass, 100 = one core saturated.
    pub cpu_percent: f64,
    /// Resident set as a share of MemTotal.
    pub mem_percent: f64,
    pub memory: MemoryBreakdown,

    /// Local wall-clock start time, or `"N/A"` when it cannot be derived.
    pub start_time_display: String,

    /// Threads, loaded on demand only. Empty after every collection pass.
    pub threads: Vec<ThreadSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_letter() {
        assert_eq!(ProcessState::from_letter('R'), ProcessState::Running);
        assert_eq!(ProcessState::from_letter('S'), ProcessState::Sleeping);
        assert_eq!(ProcessState::from_letter('D'), ProcessState::DiskWait);
        assert_eq!(ProcessState::from_letter('Z'), ProcessState::Zombie);
        assert_eq!(ProcessState::from_letter('T'), ProcessState::Stopped);
        assert_eq!(ProcessState::from_letter('t'), ProcessState::Stopped);
        assert_eq!(ProcessState::from_letter('I'), ProcessState::Other('I'));
    }

    #[test]
    fn test_state_letter_round_trip() {
        for letter in ['R', 'S', 'D', 'Z', 'T', 'I', 'X'] {
            assert_eq!(ProcessState::from_letter(letter).letter(), letter);
        }
    }

    #[test]
    fn test_process_sample_default_has_no_threads() {
        let sample = ProcessSample::default();
        assert!(sample.threads.is_empty());
        assert_eq!(sample.cpu_percent, 0.0);
    }
}
