//! Delta computation for cumulative kernel counters.
//!
//! Pure functions turning two time-separated raw readings into utilization
//! percentages. Nothing here fails: counter regressions (wraps, PID reuse,
//! CPU hotplug) and empty intervals degrade to 0%.

use tracing::warn;

use crate::model::CpuTimes;

/// CPU time consumed by one process, in jiffies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessTicks {
    pub user: u64,
    pub kernel: u64,
}

/// Busy and idle share of one CPU line over an interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CpuUsage {
    pub usage_percent: f64,
    pub idle_percent: f64,
}

/// Signed difference of two unsigned counters.
fn signed_delta(curr: u64, prev: u64) -> i64 {
    (curr as i128 - prev as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Per-process CPU usage over an interval.
///
/// `delta_system_ticks` is the advance of the aggregate jiffies total over
/// the same interval. The result is normalized so that 100 means one core
/// fully busy; it lies in `[0, 100 * num_cores]`.
///
/// Returns 0 when the system counters did not advance or when the process
/// counters went backwards (the PID was reused by a new process).
pub fn cpu_percent(
    curr: ProcessTicks,
    prev: ProcessTicks,
    delta_system_ticks: i64,
    num_cores: usize,
) -> f64 {
    if delta_system_ticks <= 0 {
        return 0.0;
    }

    let delta_proc =
        signed_delta(curr.user, prev.user).saturating_add(signed_delta(curr.kernel, prev.kernel));
    if delta_proc < 0 {
        return 0.0;
    }

    let cores = num_cores as f64;
    let percent = delta_proc as f64 * cores * 100.0 / delta_system_ticks as f64;
    percent.clamp(0.0, 100.0 * cores)
}

/// Advance of the aggregate jiffies total between two readings.
///
/// 0 when either reading is missing.
pub fn system_delta_ticks(curr: Option<&CpuTimes>, prev: Option<&CpuTimes>) -> i64 {
    match (curr, prev) {
        (Some(curr), Some(prev)) => signed_delta(curr.total(), prev.total()),
        _ => 0,
    }
}

/// Busy/idle share of one CPU line between two readings.
///
/// Without a previous reading both shares are 0. When the total did not
/// advance, usage is 0 and idle is 100 only if the idle counter did not go
/// backwards.
pub fn cpu_usage(curr: &CpuTimes, prev: Option<&CpuTimes>) -> CpuUsage {
    let Some(prev) = prev else {
        return CpuUsage::default();
    };

    let delta_total = signed_delta(curr.total(), prev.total());
    let delta_idle = signed_delta(curr.idle, prev.idle);

    if delta_total <= 0 {
        let idle_percent = if delta_total == 0 && delta_idle >= 0 {
            100.0
        } else {
            0.0
        };
        return CpuUsage {
            usage_percent: 0.0,
            idle_percent,
        };
    }

    let usage_percent =
        ((1.0 - delta_idle as f64 / delta_total as f64) * 100.0).clamp(0.0, 100.0);
    CpuUsage {
        usage_percent,
        idle_percent: 100.0 - usage_percent,
    }
}

/// Busy share of every core between two readings.
///
/// The result always has one entry per current core. If the core count
/// changed since the previous reading every core reports 0.
pub fn per_core_usage(curr: &[CpuTimes], prev: &[CpuTimes]) -> Vec<f64> {
    if curr.len() != prev.len() {
        if !prev.is_empty() {
            warn!(
                previous = prev.len(),
                current = curr.len(),
                "core count changed between passes"
            );
        }
        return vec![0.0; curr.len()];
    }

    curr.iter()
        .zip(prev)
        .map(|(c, p)| cpu_usage(c, Some(p)).usage_percent)
        .collect()
}

/// `part / whole * 100`, 0 when `whole` is 0.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
