//! One complete, internally consistent collection result.

use serde::{Deserialize, Serialize};

use super::process::ProcessSample;
use super::system::GlobalSample;

/// Global and per-process metrics produced by a single sampler pass.
///
/// `global.total_processes == processes.len()` holds for every snapshot the
/// sampler produces.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Snapshot {
    /// Unix timestamp (seconds) at the start of the pass.
    pub timestamp: i64,
    /// Monotonic pass counter, 0 for the empty snapshot published before any pass.
    pub sequence: u64,
    pub global: GlobalSample,
    pub processes: Vec<ProcessSample>,
}

impl Snapshot {
    /// Looks up a process by PID.
    pub fn process(&self, pid: u32) -> Option<&ProcessSample> {
        self.processes.iter().find(|p| p.pid == pid)
    }

    /// Mutable lookup by PID.
    pub fn process_mut(&mut self, pid: u32) -> Option<&mut ProcessSample> {
        self.processes.iter_mut().find(|p| p.pid == pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_lookup() {
        let snapshot = Snapshot {
            processes: vec![
                ProcessSample {
                    pid: 1,
                    ..Default::default()
                },
                ProcessSample {
                    pid: 42,
                    command_name: "bash".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(snapshot.process(42).map(|p| p.command_name.as_str()), Some("bash"));
        assert!(snapshot.process(7).is_none());
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = Snapshot::default();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"processes\":[]"));
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
