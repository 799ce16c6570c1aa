//! One full collection pass.
//!
//! The `Sampler` reads raw counters through a [`RawSource`], derives the
//! percentages against the previous pass and returns both the finished
//! [`Snapshot`] and the [`DeltaState`] to feed into the next pass. It holds no
//! mutable state of its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, trace, warn};

use crate::collector::{CollectError, ProcessRaw, RawSource};
use crate::delta::{self, ProcessTicks};
use crate::fmt::format_start_time;
use crate::model::{CpuTimes, GlobalSample, ProcessSample, ProcessState, Snapshot};

/// Raw readings of the previous pass, needed to compute deltas.
///
/// Created empty before the first pass and replaced wholesale by every pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaState {
    global: Option<CpuTimes>,
    per_core: Vec<CpuTimes>,
    processes: HashMap<u32, ProcessTicks>,
    sequence: u64,
}

impl DeltaState {
    /// State before any pass has run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes this state descends from.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Tick counters retained for a PID, if it was seen in the previous pass.
    pub fn process_ticks(&self, pid: u32) -> Option<ProcessTicks> {
        self.processes.get(&pid).copied()
    }
}

/// Timing information for each phase of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassTiming {
    /// Whole pass.
    pub total: Duration,
    /// CPU, memory, uptime and load counters.
    pub global: Duration,
    /// Enumeration and per-process reads.
    pub processes: Duration,
}

/// Produces snapshots from a raw counter source.
pub struct Sampler<S: RawSource> {
    source: Arc<S>,
}

impl<S: RawSource> Sampler<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// The raw source this sampler reads from.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Runs one pass against `prev` and returns the snapshot plus the state
    /// for the next pass.
    pub fn collect(&self, prev: &DeltaState) -> (Snapshot, DeltaState) {
        let (snapshot, state, _) = self.collect_timed(prev);
        (snapshot, state)
    }

    /// Like [`Sampler::collect`], also reporting how long each phase took.
    ///
    /// Never fails: an unreadable counter leaves its fields at zero, a
    /// process that exits mid-pass or cannot be parsed is left out.
    pub fn collect_timed(&self, prev: &DeltaState) -> (Snapshot, DeltaState, PassTiming) {
        let total_start = Instant::now();
        let mut timing = PassTiming::default();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let now_epoch = now.as_secs_f64();

        let start = Instant::now();
        let global_jiffies = self.source.read_global_jiffies().map_or_else(
            |e| {
                warn!(error = %e, "failed to read aggregate cpu counters");
                None
            },
            Some,
        );
        let per_core_jiffies = self.source.read_per_core_jiffies().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read per-core cpu counters");
            Vec::new()
        });
        let uptime = self.source.read_uptime_seconds().map_or_else(
            |e| {
                debug!(error = %e, "uptime unavailable");
                None
            },
            Some,
        );
        let mut global = self.collect_global(prev, global_jiffies, per_core_jiffies, uptime);
        timing.global = start.elapsed();

        let start = Instant::now();
        let delta_system_ticks = delta::system_delta_ticks(global_jiffies.as_ref(), prev.global.as_ref());
        let pids = self.source.list_process_ids().unwrap_or_else(|e| {
            warn!(error = %e, "failed to enumerate processes");
            Vec::new()
        });

        let mut processes = Vec::with_capacity(pids.len());
        let mut ticks = HashMap::with_capacity(pids.len());
        for pid in pids {
            let raw = match self.source.read_process_raw(pid) {
                Ok(raw) => raw,
                Err(CollectError::ProcessGone(_)) => {
                    trace!(pid, "process exited before it could be read");
                    continue;
                }
                Err(CollectError::Parse {
                    context,
                    raw,
                    message,
                }) => {
                    warn!(pid, context = %context, raw = %raw, "skipping malformed process entry: {}", message);
                    continue;
                }
                Err(e) => {
                    debug!(pid, error = %e, "skipping unreadable process");
                    continue;
                }
            };

            let current = ProcessTicks {
                user: raw.utime,
                kernel: raw.stime,
            };
            let cpu_percent = prev
                .process_ticks(pid)
                .map(|previous| {
                    delta::cpu_percent(current, previous, delta_system_ticks, global.num_cores)
                })
                .unwrap_or(0.0);
            ticks.insert(pid, current);

            let start_time_display = format_start_time(now_epoch, uptime, raw.starttime, global.clock_hz);
            processes.push(self.build_process(raw, cpu_percent, &global, start_time_display));
        }
        processes.sort_unstable_by_key(|p| p.pid);
        timing.processes = start.elapsed();

        global.total_processes = processes.len();
        global.total_threads = processes.iter().map(|p| p.thread_count).sum();
        global.running_processes = processes
            .iter()
            .filter(|p| p.state == ProcessState::Running)
            .count();

        let state = DeltaState {
            global: global_jiffies,
            per_core: global.per_core_jiffies.clone(),
            processes: ticks,
            sequence: prev.sequence + 1,
        };
        let snapshot = Snapshot {
            timestamp: now.as_secs() as i64,
            sequence: state.sequence,
            global,
            processes,
        };

        timing.total = total_start.elapsed();
        (snapshot, state, timing)
    }

    /// System-wide part of a pass. Process aggregates are filled in later.
    fn collect_global(
        &self,
        prev: &DeltaState,
        global_jiffies: Option<CpuTimes>,
        per_core_jiffies: Vec<CpuTimes>,
        uptime: Option<f64>,
    ) -> GlobalSample {
        let usage = match &global_jiffies {
            Some(curr) => delta::cpu_usage(curr, prev.global.as_ref()),
            None => delta::CpuUsage::default(),
        };
        let per_core_usage_percent = delta::per_core_usage(&per_core_jiffies, &prev.per_core);

        let mem = self.source.read_mem_fields().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read memory counters");
            HashMap::new()
        });
        let field = |name: &str| mem.get(name).copied().unwrap_or(0);

        let mem_total_kb = field("MemTotal");
        let mem_free_kb = field("MemFree");
        // MemAvailable is missing before Linux 3.14
        let mem_available_kb = mem.get("MemAvailable").copied().unwrap_or(mem_free_kb);
        let mem_used_kb = mem_total_kb.saturating_sub(mem_available_kb);
        let swap_total_kb = field("SwapTotal");
        let swap_free_kb = field("SwapFree");
        let swap_used_kb = swap_total_kb.saturating_sub(swap_free_kb);

        let load_avg = self.source.read_load_average().unwrap_or_else(|e| {
            debug!(error = %e, "load average unavailable");
            Default::default()
        });

        GlobalSample {
            cpu_usage_percent: usage.usage_percent,
            cpu_idle_percent: usage.idle_percent,
            num_cores: per_core_usage_percent.len(),
            per_core_usage_percent,
            global_jiffies: global_jiffies.unwrap_or_default(),
            per_core_jiffies,
            mem_total_kb,
            mem_free_kb,
            mem_available_kb,
            mem_buffers_kb: field("Buffers"),
            mem_cached_kb: field("Cached"),
            mem_used_kb,
            mem_used_percent: delta::percent_of(mem_used_kb, mem_total_kb),
            swap_total_kb,
            swap_free_kb,
            swap_used_kb,
            swap_used_percent: delta::percent_of(swap_used_kb, swap_total_kb),
            uptime_seconds: uptime.unwrap_or(0.0),
            load_avg,
            total_processes: 0,
            total_threads: 0,
            running_processes: 0,
            clock_hz: self.source.clock_hz(),
        }
    }

    fn build_process(
        &self,
        raw: ProcessRaw,
        cpu_percent: f64,
        global: &GlobalSample,
        start_time_display: String,
    ) -> ProcessSample {
        let mem_percent =
            delta::percent_of(raw.memory.resident_kb, global.mem_total_kb).min(100.0);

        ProcessSample {
            pid: raw.pid,
            owner_user: self.source.resolve_username(raw.uid),
            command_name: raw.comm,
            command_line: raw.cmdline,
            state: raw.state,
            parent_pid: raw.ppid,
            uid: raw.uid,
            priority: raw.priority,
            nice: raw.nice,
            user_time_ticks: raw.utime,
            kernel_time_ticks: raw.stime,
            start_time_ticks: raw.starttime,
            thread_count: raw.num_threads,
            cpu_percent,
            mem_percent,
            memory: raw.memory,
            start_time_display,
            threads: Vec::new(),
        }
    }
}
