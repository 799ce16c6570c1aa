//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing various system conditions.

use super::filesystem::{MockFs, stat_line};

const BASH_STATUS: &str = "\
Name:\tbash
Umask:\t0022
State:\tR (running)
Pid:\t1000
PPid:\t1
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
VmPeak:\t   20000 kB
VmSize:\t   18000 kB
VmLck:\t       0 kB
VmPin:\t       0 kB
VmHWM:\t    6000 kB
VmRSS:\t    5000 kB
RssAnon:\t    3000 kB
RssFile:\t    1800 kB
RssShmem:\t     200 kB
VmData:\t    2500 kB
VmStk:\t     132 kB
VmExe:\t     900 kB
VmLib:\t    2100 kB
VmPTE:\t      60 kB
VmSwap:\t       0 kB
Threads:\t1
";

impl MockFs {
    /// Creates a typical 4-core system with a few processes.
    ///
    /// Includes: init (PID 1), a running bash shell (PID 1000) and a kernel
    /// worker thread (PID 1001).
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        // /etc/passwd for user name resolution
        fs.add_file(
            "/etc/passwd",
            "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin
user:x:1000:1000:User:/home/user:/bin/bash
",
        );

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
Dirty:              1024 kB
Slab:             512000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        // PID 1 - init
        fs.add_process(
            1,
            &stat_line(1, "systemd", 'S', 0, 150, 80, 1, 1),
            "Name:\tsystemd\nPid:\t1\nPPid:\t0\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\nVmSize:\t  170000 kB\nVmRSS:\t   12000 kB\nThreads:\t1\n",
            "/sbin/init\0splash\0",
        );

        // PID 1000 - interactive shell
        fs.add_process(
            1000,
            &stat_line(1000, "bash", 'R', 1, 10, 5, 1, 100000),
            BASH_STATUS,
            "/bin/bash\0--login\0",
        );

        // PID 1001 - kernel thread, no cmdline and no Vm* lines
        fs.add_process(
            1001,
            &stat_line(1001, "kworker/0:1", 'I', 2, 0, 42, 1, 300),
            "Name:\tkworker/0:1\nPid:\t1001\nPPid:\t2\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\nThreads:\t1\n",
            "",
        );

        fs
    }

    /// Typical system plus a zombie process (PID 4000).
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            4000,
            &stat_line(4000, "defunct", 'Z', 1000, 3, 1, 1, 200000),
            "Name:\tdefunct\nState:\tZ (zombie)\nPid:\t4000\nPPid:\t1000\nUid:\t1000\t1000\t1000\t1000\nThreads:\t1\n",
            "",
        );
        fs
    }

    /// Typical system plus processes with unusual command names.
    ///
    /// PID 5000 has spaces in its name, PID 5001 has parentheses.
    pub fn with_special_names() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            5000,
            &stat_line(5000, "Web Content", 'S', 1000, 500, 100, 30, 150000),
            "Name:\tWeb Content\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t  400000 kB\n",
            "/usr/lib/firefox/firefox\0-contentproc\0",
        );
        fs.add_process(
            5001,
            &stat_line(5001, "(sd-pam)", 'S', 999, 0, 0, 1, 900),
            "Name:\t(sd-pam)\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t    2000 kB\n",
            "(sd-pam)\0",
        );
        fs
    }

    /// Typical system plus a multi-threaded server (PID 2000, 3 threads).
    ///
    /// Thread 2002 has no `comm` file.
    pub fn with_threads() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            2000,
            &stat_line(2000, "server", 'S', 1, 900, 300, 3, 50000),
            "Name:\tserver\nUid:\t65534\t65534\t65534\t65534\nVmRSS:\t  163840 kB\nThreads:\t3\n",
            "/usr/bin/server\0--port\08080\0",
        );
        fs.add_thread(2000, 2000, 'S', Some("server"));
        fs.add_thread(2000, 2001, 'R', Some("worker-1"));
        fs.add_thread(2000, 2002, 'S', None);
        fs
    }

    /// Typical system where PID 3000 is listed but exits before it is read.
    pub fn with_vanished_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_dir("/proc/3000");
        fs
    }

    /// Typical system plus a process with a truncated stat line (PID 6000).
    pub fn with_malformed_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            6000,
            "6000 (broken) S 1 2 3\n",
            "Name:\tbroken\nUid:\t0\t0\t0\t0\n",
            "broken\0",
        );
        fs
    }
}
