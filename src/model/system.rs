//! System-wide metrics derived from `/proc/stat`, `/proc/meminfo`,
//! `/proc/uptime` and `/proc/loadavg`.
//!
//! Raw counters are kept next to the derived percentages so that a consumer
//! can always see which readings a percentage was computed from.

use serde::{Deserialize, Serialize};

/// Cumulative CPU time counters for one CPU line of `/proc/stat`.
///
/// Source: `/proc/stat` columns 1..=8 (`cpu` aggregate or `cpuN`).
/// All values are in jiffies (USER_HZ ticks) since boot.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct CpuTimes {
    /// Time spent in user mode.
    pub user: u64,
    /// Time spent in user mode with low priority (nice).
    pub nice: u64,
    /// Time spent in kernel mode.
    pub system: u64,
    /// Time spent idle.
    pub idle: u64,
    /// Time waiting for I/O to complete.
    pub iowait: u64,
    /// Time servicing hardware interrupts.
    pub irq: u64,
    /// Time servicing softirqs.
    pub softirq: u64,
    /// Time stolen by the hypervisor.
    pub steal: u64,
}

impl CpuTimes {
    /// Number of counters carried per CPU line.
    pub const FIELDS: usize = 8;

    /// Builds counters from the column order used by `/proc/stat`.
    pub fn from_array(values: [u64; Self::FIELDS]) -> Self {
        let [user, nice, system, idle, iowait, irq, softirq, steal] = values;
        Self {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
        }
    }

    /// Counters in `/proc/stat` column order.
    pub fn as_array(&self) -> [u64; Self::FIELDS] {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
    }

    /// Sum of all eight counters, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.as_array().iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Load averages over 1, 5 and 15 minutes.
///
/// Source: `/proc/loadavg` columns 1..=3
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// One complete set of system-wide metrics.
///
/// CPU percentages lie in `[0, 100]`; memory and swap percentages lie in
/// `[0, 100]`. `num_cores` always equals `per_core_usage_percent.len()`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct GlobalSample {
    /// Busy share of all CPUs since the previous pass.
    pub cpu_usage_percent: f64,
    /// Idle share of all CPUs since the previous pass.
    pub cpu_idle_percent: f64,
    /// Busy share of each core since the previous pass.
    pub per_core_usage_percent: Vec<f64>,

    /// Raw aggregate counters this sample was derived from.
    pub global_jiffies: CpuTimes,
    /// Raw per-core counters this sample was derived from.
    pub per_core_jiffies: Vec<CpuTimes>,

    /// MemTotal (KB).
    pub mem_total_kb: u64,
    /// MemFree (KB).
    pub mem_free_kb: u64,
    /// MemAvailable (KB), MemFree when the kernel does not report it.
    pub mem_available_kb: u64,
    /// Buffers (KB).
    pub mem_buffers_kb: u64,
    /// Cached (KB).
    pub mem_cached_kb: u64,
    /// `mem_total_kb - mem_available_kb`.
    pub mem_used_kb: u64,
    pub mem_used_percent: f64,

    /// SwapTotal (KB).
    pub swap_total_kb: u64,
    /// SwapFree (KB).
    pub swap_free_kb: u64,
    /// `swap_total_kb - swap_free_kb`.
    pub swap_used_kb: u64,
    pub swap_used_percent: f64,

    pub uptime_seconds: f64,
    pub load_avg: LoadAverage,

    /// Processes visible in this pass.
    pub total_processes: usize,
    /// Sum of `thread_count` over all visible processes.
    pub total_threads: u64,
    /// Processes in the running state.
    pub running_processes: usize,

    pub num_cores: usize,
    /// Clock ticks per second used to convert jiffies to seconds.
    pub clock_hz: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_times_total() {
        let times = CpuTimes::from_array([100, 0, 100, 700, 0, 0, 0, 0]);
        assert_eq!(times.total(), 900);
        assert_eq!(times.idle, 700);
    }

    #[test]
    fn test_cpu_times_total_saturates() {
        let times = CpuTimes::from_array([u64::MAX / 2, u64::MAX / 2, 5, 0, 0, 0, 0, 0]);
        assert_eq!(times.total(), u64::MAX);
    }

    #[test]
    fn test_cpu_times_array_order() {
        let values = [1, 2, 3, 4, 5, 6, 7, 8];
        let times = CpuTimes::from_array(values);
        assert_eq!(times.system, 3);
        assert_eq!(times.steal, 8);
        assert_eq!(times.as_array(), values);
    }
}
