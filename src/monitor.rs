//! Consumer-facing facade.
//!
//! `Monitor` wires a [`Sampler`], a [`SnapshotStore`] and a [`Poller`]
//! together. Accessors return copies of the latest published snapshot and
//! never wait for a collection pass.

use std::sync::Arc;

use tracing::debug;

use crate::collector::{ProcfsSource, RawSource, RealFs};
use crate::config::{ConfigError, MonitorConfig};
use crate::model::{GlobalSample, ProcessSample, Snapshot, ThreadSample};
use crate::poller::{Poller, PollerState};
use crate::sampler::{DeltaState, Sampler};
use crate::store::SnapshotStore;
use crate::threads::load_threads;

/// Periodically refreshed system and process metrics.
///
/// Dropping the monitor stops its poller.
pub struct Monitor<S: RawSource + 'static> {
    source: Arc<S>,
    store: Arc<SnapshotStore>,
    poller: Poller,
    config: MonitorConfig,
}

impl Monitor<ProcfsSource<RealFs>> {
    /// Monitor reading the live proc filesystem named in `config`.
    pub fn procfs(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = ProcfsSource::new(RealFs::new(), config.proc_path.as_str(), &config.passwd_path)
            .with_clock_hz(config.clock_hz);
        Self::with_source(source, config)
    }
}

impl<S: RawSource + 'static> Monitor<S> {
    /// Monitor over an arbitrary raw counter source.
    pub fn with_source(source: S, config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source: Arc::new(source),
            store: Arc::new(SnapshotStore::new()),
            poller: Poller::new(config.interval(), config.stop_timeout()),
            config,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Starts background collection. Returns `false` if it was already running.
    ///
    /// Each start begins from an empty delta state, so the first pass after
    /// a start reports 0% CPU everywhere.
    pub fn start(&self) -> bool {
        let sampler = Sampler::new(Arc::clone(&self.source));
        let store = Arc::clone(&self.store);
        let mut state = DeltaState::new();

        self.poller.start(move || {
            let (snapshot, next, timing) = sampler.collect_timed(&state);
            debug!(
                sequence = snapshot.sequence,
                processes = snapshot.processes.len(),
                total_ms = timing.total.as_millis() as u64,
                global_ms = timing.global.as_millis() as u64,
                processes_ms = timing.processes.as_millis() as u64,
                "snapshot collected"
            );
            store.publish(snapshot);
            state = next;
        })
    }

    /// Stops background collection. Safe to call at any time.
    pub fn stop(&self) {
        self.poller.stop();
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    /// Copy of the whole latest snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.store.read()
    }

    pub fn get_global_snapshot(&self) -> GlobalSample {
        self.store.read_global()
    }

    pub fn get_all_processes(&self) -> Vec<ProcessSample> {
        self.store.read_processes()
    }

    pub fn get_process(&self, pid: u32) -> Option<ProcessSample> {
        self.store.read_process(pid)
    }

    /// Loads the threads of `pid` and attaches them to the stored process.
    ///
    /// Reads `/proc/<pid>/task` on the calling thread, so this can be slow
    /// for processes with many threads.
    pub fn get_threads(&self, pid: u32) -> Vec<ThreadSample> {
        load_threads(self.source.as_ref(), &self.store, pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectError, MockFs, ProcessRaw, ThreadRaw};
    use crate::model::{CpuTimes, LoadAverage};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Delegating source whose visible process set changes on every pass.
    ///
    /// Every `panic_every`-th pass panics while reading CPU counters.
    struct ChurningSource {
        inner: ProcfsSource<MockFs>,
        passes: Arc<AtomicU64>,
        panic_every: u64,
    }

    impl ChurningSource {
        fn new(fs: MockFs, panic_every: u64) -> (Self, Arc<AtomicU64>) {
            let passes = Arc::new(AtomicU64::new(0));
            let source = Self {
                inner: ProcfsSource::new(fs, "/proc", "/etc/passwd"),
                passes: Arc::clone(&passes),
                panic_every,
            };
            (source, passes)
        }
    }

    impl RawSource for ChurningSource {
        fn read_global_jiffies(&self) -> Result<CpuTimes, CollectError> {
            let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_every > 0 && pass % self.panic_every == 0 {
                panic!("simulated reader fault");
            }
            self.inner.read_global_jiffies()
        }

        fn read_per_core_jiffies(&self) -> Result<Vec<CpuTimes>, CollectError> {
            self.inner.read_per_core_jiffies()
        }

        fn read_mem_fields(&self) -> Result<HashMap<String, u64>, CollectError> {
            self.inner.read_mem_fields()
        }

        fn read_uptime_seconds(&self) -> Result<f64, CollectError> {
            self.inner.read_uptime_seconds()
        }

        fn read_load_average(&self) -> Result<LoadAverage, CollectError> {
            self.inner.read_load_average()
        }

        fn list_process_ids(&self) -> Result<Vec<u32>, CollectError> {
            let mut pids = self.inner.list_process_ids()?;
            pids.sort_unstable();
            let keep = (self.passes.load(Ordering::SeqCst) as usize % pids.len().max(1)) + 1;
            pids.truncate(keep);
            Ok(pids)
        }

        fn read_process_raw(&self, pid: u32) -> Result<ProcessRaw, CollectError> {
            self.inner.read_process_raw(pid)
        }

        fn list_threads(&self, pid: u32) -> Vec<ThreadRaw> {
            self.inner.list_threads(pid)
        }

        fn resolve_username(&self, uid: u32) -> String {
            self.inner.resolve_username(uid)
        }

        fn clock_hz(&self) -> u64 {
            self.inner.clock_hz()
        }
    }

    fn mock_monitor(fs: MockFs, interval: f64) -> Monitor<ProcfsSource<MockFs>> {
        let source = ProcfsSource::new(fs, "/proc", "/etc/passwd");
        Monitor::with_source(source, MonitorConfig::with_interval(interval)).unwrap()
    }

    fn wait_for_sequence<S: RawSource + 'static>(monitor: &Monitor<S>, sequence: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if monitor.snapshot().sequence >= sequence {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_accessors_before_start() {
        let monitor = mock_monitor(MockFs::typical_system(), 1.0);

        assert_eq!(monitor.poller_state(), PollerState::Idle);
        assert_eq!(monitor.get_global_snapshot(), GlobalSample::default());
        assert!(monitor.get_all_processes().is_empty());
        assert!(monitor.get_process(1).is_none());
        assert!(monitor.get_threads(1).is_empty());
        monitor.stop();
    }

    #[test]
    fn test_start_publishes_seed_snapshot() {
        let monitor = mock_monitor(MockFs::typical_system(), 30.0);

        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(wait_for_sequence(&monitor, 1));

        let global = monitor.get_global_snapshot();
        assert_eq!(global.total_processes, 3);
        assert_eq!(global.num_cores, 4);
        assert_eq!(monitor.get_all_processes().len(), 3);
        assert_eq!(monitor.get_process(1000).unwrap().owner_user, "user");

        monitor.stop();
        assert_eq!(monitor.poller_state(), PollerState::Idle);
    }

    #[test]
    fn test_get_threads_through_monitor() {
        let monitor = mock_monitor(MockFs::with_threads(), 30.0);
        monitor.start();
        assert!(wait_for_sequence(&monitor, 1));

        let threads = monitor.get_threads(2000);
        assert_eq!(threads.len(), 3);
        assert_eq!(monitor.get_process(2000).unwrap().threads, threads);
        assert!(monitor.get_threads(31337).is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let source = ProcfsSource::new(MockFs::new(), "/proc", "/etc/passwd");
        let result = Monitor::with_source(source, MonitorConfig::with_interval(0.0));
        assert!(matches!(result, Err(ConfigError::InvalidInterval(_))));

        let config = MonitorConfig {
            proc_path: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            Monitor::procfs(config),
            Err(ConfigError::EmptyProcPath)
        ));
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let (source, _) = ChurningSource::new(MockFs::with_special_names(), 0);
        let monitor = Arc::new(
            Monitor::with_source(source, MonitorConfig::with_interval(0.002)).unwrap(),
        );
        monitor.start();
        assert!(wait_for_sequence(monitor.as_ref(), 1));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    let mut sizes = std::collections::HashSet::new();
                    for _ in 0..3000 {
                        let snapshot = monitor.snapshot();
                        assert_eq!(snapshot.global.total_processes, snapshot.processes.len());
                        sizes.insert(snapshot.processes.len());
                    }
                    sizes.len()
                })
            })
            .collect();

        for reader in readers {
            assert!(reader.join().unwrap() >= 1);
        }
        monitor.stop();
    }

    #[test]
    fn test_faulty_passes_keep_last_snapshot_and_loop_alive() {
        let (source, passes) = ChurningSource::new(MockFs::typical_system(), 2);
        let monitor = Monitor::with_source(source, MonitorConfig::with_interval(0.01)).unwrap();
        monitor.start();

        // every second pass panics, sequence still advances on the others
        assert!(wait_for_sequence(&monitor, 3));
        assert!(passes.load(Ordering::SeqCst) >= 5);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.global.total_processes, snapshot.processes.len());
        monitor.stop();
    }

    #[test]
    fn test_drop_stops_polling() {
        let (source, passes) = ChurningSource::new(MockFs::typical_system(), 0);
        let monitor = Monitor::with_source(source, MonitorConfig::with_interval(0.01)).unwrap();
        monitor.start();
        assert!(wait_for_sequence(&monitor, 2));
        drop(monitor);

        let after_drop = passes.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(passes.load(Ordering::SeqCst), after_drop);
    }
}
