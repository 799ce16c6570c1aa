//! procsnapd - periodic process and system telemetry logger.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(not(target_os = "linux"))]
use procsnap::collector::{MockFs, ProcfsSource};
use procsnap::fmt::{format_duration, format_kb};
use procsnap::{GlobalSample, Monitor, MonitorConfig, ProcessSample, Snapshot};

/// Process and system telemetry daemon.
#[derive(Parser)]
#[command(name = "procsnapd", about = "Process and system telemetry daemon", version)]
struct Args {
    /// Collection interval in seconds (fractions allowed).
    #[arg(short, long, default_value = "2")]
    interval: f64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to the passwd file used to resolve user names.
    #[arg(long, default_value = "/etc/passwd")]
    passwd_path: String,

    /// Clock ticks per second of the kernel counters (USER_HZ).
    #[arg(long, default_value = "100")]
    clock_hz: u64,

    /// Number of processes by CPU usage to report per interval.
    #[arg(short = 'n', long, default_value = "5")]
    top: usize,

    /// Print every snapshot as one JSON line on stdout instead of the summary.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            update_interval_seconds: self.interval,
            proc_path: self.proc_path.clone(),
            passwd_path: self.passwd_path.clone(),
            clock_hz: self.clock_hz,
            ..Default::default()
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["procsnapd", "procsnap"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// One-line summary of the system-wide metrics.
fn describe_global(global: &GlobalSample) -> String {
    format!(
        "cpu {:.1}% ({} cores), mem {:.1}% of {}, swap {:.1}%, {} processes ({} running), {} threads, load {:.2} {:.2} {:.2}, up {}",
        global.cpu_usage_percent,
        global.num_cores,
        global.mem_used_percent,
        format_kb(global.mem_total_kb),
        global.swap_used_percent,
        global.total_processes,
        global.running_processes,
        global.total_threads,
        global.load_avg.one,
        global.load_avg.five,
        global.load_avg.fifteen,
        format_duration(global.uptime_seconds as u64),
    )
}

/// The `n` processes with the highest CPU usage, busiest first.
fn top_processes(processes: &[ProcessSample], n: usize) -> Vec<&ProcessSample> {
    let mut sorted: Vec<&ProcessSample> = processes.iter().collect();
    sorted.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then_with(|| a.pid.cmp(&b.pid))
    });
    sorted.truncate(n);
    sorted
}

fn describe_process(p: &ProcessSample) -> String {
    format!(
        "{:>7} {:<10} {} {:>6.1}% {:>5.1}% {:>8} {} {}",
        p.pid,
        p.owner_user,
        p.state.letter(),
        p.cpu_percent,
        p.mem_percent,
        format_kb(p.memory.resident_kb),
        p.start_time_display,
        p.command_line,
    )
}

fn report(snapshot: &Snapshot, top: usize, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }
        return;
    }

    info!("Snapshot #{}: {}", snapshot.sequence, describe_global(&snapshot.global));
    for process in top_processes(&snapshot.processes, top) {
        info!("  {}", describe_process(process));
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("procsnapd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, proc={}, top={}",
        args.interval, args.proc_path, args.top
    );

    let config = args.monitor_config();

    #[cfg(target_os = "linux")]
    let monitor = Monitor::procfs(config);
    #[cfg(not(target_os = "linux"))]
    let monitor = {
        warn!("Not running on Linux, using mock filesystem");
        let source = ProcfsSource::new(MockFs::typical_system(), "/proc", "/etc/passwd");
        Monitor::with_source(source, config)
    };

    let monitor = match monitor {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    monitor.start();
    let interval = monitor.config().interval();
    let mut last_reported = 0;

    while running.load(Ordering::SeqCst) {
        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }

        let snapshot = monitor.snapshot();
        if snapshot.sequence == last_reported {
            continue;
        }
        last_reported = snapshot.sequence;
        report(&snapshot, args.top, args.json);
    }

    info!("Shutting down...");
    monitor.stop();
    info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pid: u32, cpu_percent: f64) -> ProcessSample {
        ProcessSample {
            pid,
            cpu_percent,
            owner_user: "root".to_string(),
            command_line: format!("cmd{}", pid),
            ..Default::default()
        }
    }

    #[test]
    fn top_processes_sorted_by_cpu_then_pid() {
        let processes = vec![
            process(3, 10.0),
            process(1, 150.0),
            process(2, 10.0),
            process(4, 0.0),
        ];
        let pids: Vec<u32> = top_processes(&processes, 3).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 2, 3]);
        assert!(top_processes(&processes, 0).is_empty());
        assert_eq!(top_processes(&processes, 10).len(), 4);
    }

    #[test]
    fn describe_global_mentions_key_figures() {
        let global = GlobalSample {
            cpu_usage_percent: 20.0,
            num_cores: 4,
            mem_total_kb: 16_000_000,
            total_processes: 3,
            running_processes: 1,
            total_threads: 7,
            uptime_seconds: 185.0,
            ..Default::default()
        };
        let line = describe_global(&global);
        assert!(line.contains("cpu 20.0% (4 cores)"));
        assert!(line.contains("of 15.3G"));
        assert!(line.contains("3 processes (1 running)"));
        assert!(line.contains("7 threads"));
        assert!(line.contains("up 3m5s"));
    }

    #[test]
    fn describe_process_includes_command_line() {
        let line = describe_process(&process(42, 12.5));
        assert!(line.contains("42"));
        assert!(line.contains("12.5%"));
        assert!(line.ends_with("cmd42"));
    }

    #[test]
    fn args_map_onto_config() {
        let args = Args::parse_from(["procsnapd", "--interval", "0.5", "--proc-path", "/host/proc", "-n", "3"]);
        let config = args.monitor_config();
        assert_eq!(config.update_interval_seconds, 0.5);
        assert_eq!(config.proc_path, "/host/proc");
        assert_eq!(args.top, 3);
        assert!(config.validate().is_ok());
    }
}
