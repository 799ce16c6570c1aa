//! Shared formatting helpers.
//!
//! Pure functions used by the sampler (process start time) and the daemon
//! (summary lines). Nothing here touches the store or the filesystem.

use chrono::{DateTime, Local, TimeZone};

/// Shown when a start time cannot be computed.
pub const START_TIME_UNAVAILABLE: &str = "N/A";

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock start of a process as a Unix epoch.
///
/// `boot_epoch = now - uptime`, start = `boot_epoch + start_ticks / clock_hz`.
/// Returns `None` when uptime is missing, `clock_hz` is 0, or the result is
/// negative or not finite.
pub fn process_start_epoch(
    now_epoch: f64,
    uptime_seconds: Option<f64>,
    start_ticks: u64,
    clock_hz: u64,
) -> Option<i64> {
    let uptime = uptime_seconds?;
    if clock_hz == 0 || !uptime.is_finite() || !now_epoch.is_finite() {
        return None;
    }
    let epoch = now_epoch - uptime + start_ticks as f64 / clock_hz as f64;
    if !epoch.is_finite() || epoch < 0.0 || epoch > i64::MAX as f64 {
        return None;
    }
    Some(epoch as i64)
}

/// Formats a Unix epoch as local time, `"N/A"` if not representable.
pub fn format_epoch_local(epoch: i64) -> String {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|dt: DateTime<Local>| dt.format(START_TIME_FORMAT).to_string())
        .unwrap_or_else(|| START_TIME_UNAVAILABLE.to_string())
}

/// Display string for a process start time.
pub fn format_start_time(
    now_epoch: f64,
    uptime_seconds: Option<f64>,
    start_ticks: u64,
    clock_hz: u64,
) -> String {
    process_start_epoch(now_epoch, uptime_seconds, start_ticks, clock_hz)
        .map(format_epoch_local)
        .unwrap_or_else(|| START_TIME_UNAVAILABLE.to_string())
}

/// Format a KB count as human-readable size: `"1.5G"`, `"100.3M"`, `"512K"`.
pub fn format_kb(kb: u64) -> String {
    let f = kb as f64;
    if kb >= 1024 * 1024 {
        format!("{:.1}G", f / (1024.0 * 1024.0))
    } else if kb >= 1024 {
        format!("{:.1}M", f / 1024.0)
    } else {
        format!("{}K", kb)
    }
}

/// Format duration in seconds: `"3m5s"`, `"2h10m"`, `"4d3h"`.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d{}h", secs / 86400, (secs % 86400) / 3600)
    }
}
