//! Holder of the latest published snapshot.
//!
//! Writers replace the whole snapshot, readers get deep copies. The lock is
//! held only to swap or clone, never across file I/O.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::{GlobalSample, ProcessSample, Snapshot, ThreadSample};

/// Thread-safe store for the most recent complete snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Mutex<Snapshot>,
}

impl SnapshotStore {
    /// Creates a store holding an empty snapshot (sequence 0).
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections only clone or swap whole values; a poisoned lock
    // still guards a complete snapshot.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically replaces the visible snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        let previous = std::mem::replace(&mut *self.lock(), snapshot);
        // dropped outside the lock
        drop(previous);
    }

    /// Independent copy of the current snapshot.
    pub fn read(&self) -> Snapshot {
        self.lock().clone()
    }

    pub fn read_global(&self) -> GlobalSample {
        self.lock().global.clone()
    }

    pub fn read_processes(&self) -> Vec<ProcessSample> {
        self.lock().processes.clone()
    }

    /// Copy of one process, `None` if it is not in the current snapshot.
    pub fn read_process(&self, pid: u32) -> Option<ProcessSample> {
        self.lock().process(pid).cloned()
    }

    /// Sequence number of the current snapshot, 0 before the first publish.
    pub fn sequence(&self) -> u64 {
        self.lock().sequence
    }

    /// Attaches a freshly read thread list to a stored process.
    ///
    /// A non-empty list whose length differs from the stored `thread_count`
    /// updates the count (and the global thread total with it). Returns `None`
    /// when the process is no longer in the snapshot.
    pub fn merge_threads(&self, pid: u32, threads: Vec<ThreadSample>) -> Option<Vec<ThreadSample>> {
        let mut snapshot = self.lock();
        let process = snapshot.process_mut(pid)?;

        let previous = process.thread_count;
        let observed = threads.len() as u64;
        if observed > 0 && observed != previous {
            process.thread_count = observed;
        }
        process.threads = threads.clone();

        if process.thread_count != previous {
            snapshot.global.total_threads = (snapshot.global.total_threads + observed).saturating_sub(previous);
        }
        Some(threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessState;
    use std::sync::Arc;
    use std::thread;

    fn process(pid: u32, thread_count: u64) -> ProcessSample {
        ProcessSample {
            pid,
            command_name: format!("proc{}", pid),
            thread_count,
            ..Default::default()
        }
    }

    fn snapshot(sequence: u64, pids: &[u32]) -> Snapshot {
        let processes: Vec<ProcessSample> = pids.iter().map(|&pid| process(pid, 2)).collect();
        let mut snapshot = Snapshot {
            sequence,
            processes,
            ..Default::default()
        };
        snapshot.global.total_processes = snapshot.processes.len();
        snapshot.global.total_threads = 2 * snapshot.processes.len() as u64;
        snapshot
    }

    fn thread(pid: u32, tid: u32) -> ThreadSample {
        ThreadSample {
            tid,
            owning_pid: pid,
            state: ProcessState::Sleeping,
            name: format!("t{}", tid),
        }
    }

    #[test]
    fn test_empty_store() {
        let store = SnapshotStore::new();
        assert_eq!(store.sequence(), 0);
        assert!(store.read_processes().is_empty());
        assert!(store.read_process(1).is_none());
    }

    #[test]
    fn test_publish_and_read() {
        let store = SnapshotStore::new();
        store.publish(snapshot(1, &[1, 2, 3]));

        assert_eq!(store.sequence(), 1);
        assert_eq!(store.read_global().total_processes, 3);
        assert_eq!(store.read_process(2).unwrap().command_name, "proc2");
        assert!(store.read_process(4).is_none());
    }

    #[test]
    fn test_read_returns_independent_copy() {
        let store = SnapshotStore::new();
        store.publish(snapshot(1, &[1]));

        let mut copy = store.read();
        copy.processes[0].command_name = "changed".to_string();
        copy.processes.clear();

        assert_eq!(store.read_process(1).unwrap().command_name, "proc1");

        store.publish(snapshot(2, &[5, 6]));
        assert!(copy.processes.is_empty());
        assert_eq!(store.read().sequence, 2);
    }

    #[test]
    fn test_merge_threads_reconciles_count() {
        let store = SnapshotStore::new();
        store.publish(snapshot(1, &[10, 11]));

        let merged = store
            .merge_threads(10, vec![thread(10, 10), thread(10, 12), thread(10, 13)])
            .unwrap();
        assert_eq!(merged.len(), 3);

        let stored = store.read_process(10).unwrap();
        assert_eq!(stored.thread_count, 3);
        assert_eq!(stored.threads, merged);
        assert_eq!(store.read_global().total_threads, 5);
    }

    #[test]
    fn test_merge_fewer_threads_lowers_global_total() {
        let store = SnapshotStore::new();
        store.publish(snapshot(1, &[10, 11]));

        store.merge_threads(11, vec![thread(11, 11)]).unwrap();

        assert_eq!(store.read_process(11).unwrap().thread_count, 1);
        assert_eq!(store.read_process(10).unwrap().thread_count, 2);
        assert_eq!(store.read_global().total_threads, 3);
    }

    #[test]
    fn test_merge_empty_threads_keeps_count() {
        let store = SnapshotStore::new();
        store.publish(snapshot(1, &[10]));

        let merged = store.merge_threads(10, Vec::new()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(store.read_process(10).unwrap().thread_count, 2);
    }

    #[test]
    fn test_merge_threads_of_missing_process() {
        let store = SnapshotStore::new();
        store.publish(snapshot(1, &[10]));

        assert!(store.merge_threads(99, vec![thread(99, 99)]).is_none());
        assert_eq!(store.read_global().total_threads, 2);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let store = Arc::new(SnapshotStore::new());
        store.publish(snapshot(1, &[1]));

        let poisoner = Arc::clone(&store);
        let result = thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the store");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(store.read().sequence, 1);
        store.publish(snapshot(2, &[1, 2]));
        assert_eq!(store.read_processes().len(), 2);
    }

    #[test]
    fn test_readers_never_see_mixed_snapshots() {
        let store = Arc::new(SnapshotStore::new());
        store.publish(snapshot(1, &[1]));

        let writer_store = Arc::clone(&store);
        let writer = thread::spawn(move || {
            for seq in 2..500u64 {
                let pids: Vec<u32> = (0..(seq % 17) as u32).collect();
                writer_store.publish(snapshot(seq, &pids));
            }
        });

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        let s = store.read();
                        assert_eq!(s.global.total_processes, s.processes.len());
                        assert_eq!(s.global.total_threads, 2 * s.processes.len() as u64);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
