//! On-demand thread loading for a single process.

use tracing::debug;

use crate::collector::RawSource;
use crate::model::ThreadSample;
use crate::store::SnapshotStore;

/// Reads the threads of `pid` and merges them into the stored snapshot.
///
/// The task directory is read before the store lock is taken, so this call
/// may block on I/O but never blocks readers of the store. Returns an empty
/// list when the process is gone from the store by the time of the merge.
pub fn load_threads<S: RawSource + ?Sized>(
    source: &S,
    store: &SnapshotStore,
    pid: u32,
) -> Vec<ThreadSample> {
    let threads: Vec<ThreadSample> = source
        .list_threads(pid)
        .into_iter()
        .map(|t| ThreadSample {
            tid: t.tid,
            owning_pid: pid,
            state: t.state,
            name: t.name,
        })
        .collect();

    match store.merge_threads(pid, threads) {
        Some(threads) => {
            debug!(pid, threads = threads.len(), "threads loaded");
            threads
        }
        None => {
            debug!(pid, "process left the snapshot before its threads were merged");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MockFs, ProcfsSource};
    use crate::model::ProcessState;
    use crate::sampler::{DeltaState, Sampler};
    use std::sync::Arc;

    fn published(fs: MockFs) -> (Arc<ProcfsSource<MockFs>>, SnapshotStore) {
        let source = Arc::new(ProcfsSource::new(fs, "/proc", "/etc/passwd"));
        let (snapshot, _) = Sampler::new(Arc::clone(&source)).collect(&DeltaState::new());
        let store = SnapshotStore::new();
        store.publish(snapshot);
        (source, store)
    }

    #[test]
    fn test_load_threads_merges_into_store() {
        let (source, store) = published(MockFs::with_threads());

        let threads = load_threads(source.as_ref(), &store, 2000);
        let tids: Vec<u32> = threads.iter().map(|t| t.tid).collect();
        assert_eq!(tids, vec![2000, 2001, 2002]);
        assert!(threads.iter().all(|t| t.owning_pid == 2000));
        assert_eq!(threads[1].name, "worker-1");
        assert_eq!(threads[1].state, ProcessState::Running);
        assert_eq!(threads[2].name, "tid_2002");

        let stored = store.read_process(2000).unwrap();
        assert_eq!(stored.threads, threads);
        assert_eq!(stored.thread_count, 3);
    }

    #[test]
    fn test_load_threads_reconciles_thread_count() {
        let mut fs = MockFs::with_threads();
        fs.add_thread(2000, 2003, 'S', Some("worker-2"));
        let (source, store) = published(fs);
        let before = store.read_global().total_threads;

        let threads = load_threads(source.as_ref(), &store, 2000);
        assert_eq!(threads.len(), 4);
        assert_eq!(store.read_process(2000).unwrap().thread_count, 4);
        assert_eq!(store.read_global().total_threads, before + 1);
    }

    #[test]
    fn test_load_threads_for_process_not_in_store() {
        let (source, store) = published(MockFs::typical_system());
        assert!(load_threads(source.as_ref(), &store, 2000).is_empty());
        assert!(load_threads(source.as_ref(), &store, 424242).is_empty());
    }

    #[test]
    fn test_load_threads_without_task_directory() {
        let (source, store) = published(MockFs::typical_system());

        // listed in the snapshot but /proc/1/task is absent
        assert!(load_threads(source.as_ref(), &store, 1).is_empty());
        let stored = store.read_process(1).unwrap();
        assert_eq!(stored.thread_count, 1);
        assert!(stored.threads.is_empty());
    }
}
