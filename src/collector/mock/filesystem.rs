//! In-memory mock filesystem for testing readers without a real `/proc`.
//!
//! `MockFs` simulates a proc tree in memory. Unit tests build scenarios on
//! it, and `procsnapd` falls back to it when not running on Linux.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various `/proc` filesystem states without needing actual Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Files that exist but fail to read with `PermissionDenied`.
    denied: HashSet<PathBuf>,
}

/// Builds a `/proc/[pid]/stat` line with the fields the readers use.
///
/// Fields not covered by the arguments are filled with plausible constants.
#[allow(clippy::too_many_arguments)]
pub fn stat_line(
    pid: u32,
    comm: &str,
    state: char,
    ppid: u32,
    utime: u64,
    stime: u64,
    num_threads: u64,
    starttime: u64,
) -> String {
    format!(
        "{pid} ({comm}) {state} {ppid} {pid} {pid} 0 -1 4194304 100 0 0 0 {utime} {stime} 0 0 20 0 {num_threads} 0 {starttime} 12345678 100 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
    )
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds (or replaces) a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a single file, leaving its directory in place.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Removes a directory and everything below it.
    pub fn remove_dir_all(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.retain(|p, _| !p.starts_with(path));
        self.directories.retain(|p| !p.starts_with(path));
        self.denied.retain(|p| !p.starts_with(path));
    }

    /// Makes reads of an existing file fail with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) {
        self.denied.insert(path.as_ref().to_path_buf());
    }

    /// Adds a process with its `/proc/[pid]/` files.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `status` - Content of `/proc/[pid]/status`
    /// * `cmdline` - Content of `/proc/[pid]/cmdline` (NUL separated)
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str, cmdline: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        self.add_file(base.join("cmdline"), cmdline);
    }

    /// Adds a thread under `/proc/[pid]/task/[tid]/`.
    ///
    /// `comm` of `None` leaves the name file out.
    pub fn add_thread(&mut self, pid: u32, tid: u32, state: char, comm: Option<&str>) {
        let base = PathBuf::from(format!("/proc/{}/task/{}", pid, tid));
        let name = comm.unwrap_or("thread");
        self.add_file(base.join("stat"), stat_line(tid, name, state, pid, 0, 0, 1, 0));
        if let Some(comm) = comm {
            self.add_file(base.join("comm"), format!("{}\n", comm));
        }
    }

    /// Replaces the aggregate and per-core CPU lines of `/proc/stat`.
    pub fn set_cpu_times(&mut self, total: [u64; 8], cores: &[[u64; 8]]) {
        let line = |label: String, v: &[u64; 8]| {
            format!(
                "{} {} {} {} {} {} {} {} {} 0 0\n",
                label, v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7]
            )
        };
        let mut content = line("cpu ".to_string(), &total);
        for (idx, core) in cores.iter().enumerate() {
            content.push_str(&line(format!("cpu{}", idx), core));
        }
        content.push_str("ctxt 500000\nbtime 1700000000\nprocesses 10000\n");
        self.add_file("/proc/stat", content);
    }

    /// Rewrites the CPU time fields of an existing process.
    ///
    /// Keeps the command name and state from the current stat line.
    pub fn set_process_times(&mut self, pid: u32, utime: u64, stime: u64) {
        let path = PathBuf::from(format!("/proc/{}/stat", pid));
        let Some(current) = self.files.get(&path) else {
            return;
        };
        let (Some(open), Some(close)) = (current.find('('), current.rfind(')')) else {
            return;
        };
        let comm = current[open + 1..close].to_string();
        let fields: Vec<&str> = current[close + 1..].split_whitespace().collect();
        let field = |idx: usize| -> u64 { fields.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };
        let state = fields.first().and_then(|s| s.chars().next()).unwrap_or('S');
        let line = stat_line(
            pid,
            &comm,
            state,
            field(1) as u32,
            utime,
            stime,
            field(17),
            field(19),
        );
        self.files.insert(path, line);
    }

    /// Loads a mock filesystem from a directory snapshot.
    ///
    /// This is useful for regression tests with real `/proc` snapshots.
    pub fn from_snapshot(dir: &Path) -> io::Result<Self> {
        let mut fs = Self::new();
        load_directory_recursive(&mut fs, dir, Path::new("/proc"))?;
        Ok(fs)
    }
}

fn load_directory_recursive(
    fs: &mut MockFs,
    real_path: &Path,
    virtual_path: &Path,
) -> io::Result<()> {
    fs.add_dir(virtual_path);

    for entry in std::fs::read_dir(real_path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let real_child = entry.path();
        let virtual_child = virtual_path.join(entry.file_name());

        if file_type.is_dir() {
            load_directory_recursive(fs, &real_child, &virtual_child)?;
        } else if file_type.is_file()
            && let Ok(content) = std::fs::read_to_string(&real_child)
        {
            fs.add_file(&virtual_child, content);
        }
    }
    Ok(())
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.denied.contains(path) && self.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}
