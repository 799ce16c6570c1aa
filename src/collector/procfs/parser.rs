//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::HashMap;

use crate::model::{CpuTimes, LoadAverage};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Minimum number of fields after the `(comm)` part of `/proc/[pid]/stat`
/// needed to reach `starttime`.
const MIN_STAT_FIELDS: usize = 20;

/// Parsed data from `/proc/[pid]/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: u64,
    pub starttime: u64,
}

/// Splits a stat line into `(pid, comm, fields after comm)`.
///
/// The comm field can contain spaces and parentheses, so it spans from the
/// first `(` to the last `)`.
fn split_stat(content: &str) -> Result<(&str, &str, Vec<&str>), ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid = content[..open_paren].trim();
    let comm = &content[open_paren + 1..close_paren];
    let fields = content[close_paren + 1..].split_whitespace().collect();
    Ok((pid, comm, fields))
}

/// Parses `/proc/[pid]/stat` content.
///
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let (pid, comm, fields) = split_stat(content)?;

    let pid: u32 = pid.parse().map_err(|_| ParseError::new("invalid pid"))?;

    if fields.len() < MIN_STAT_FIELDS {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            MIN_STAT_FIELDS,
            fields.len()
        )));
    }

    let parse_field = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    let parse_field_u64 = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        pid,
        comm: comm.to_string(),
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: parse_field_u64(1, "ppid")? as u32,
        utime: parse_field_u64(11, "utime")?,
        stime: parse_field_u64(12, "stime")?,
        priority: parse_field(15, "priority")?,
        nice: parse_field(16, "nice")?,
        num_threads: parse_field_u64(17, "num_threads")?,
        starttime: parse_field_u64(19, "starttime")?,
    })
}

/// Extracts only the state letter from a `/proc/[pid]/task/[tid]/stat` line.
pub fn parse_stat_state(content: &str) -> Result<char, ParseError> {
    let (_, _, fields) = split_stat(content)?;
    fields
        .first()
        .and_then(|s| s.chars().next())
        .ok_or_else(|| ParseError::new("missing state in stat"))
}

/// Parsed data from `/proc/[pid]/status`.
///
/// Memory values are in KB; missing keys read as 0 (kernel threads have no
/// `Vm*` lines at all).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatus {
    pub name: String,
    pub uid: u32,
    pub vm_peak: u64,
    pub vm_size: u64,
    pub vm_lck: u64,
    pub vm_pin: u64,
    pub vm_hwm: u64,
    pub vm_rss: u64,
    pub rss_anon: u64,
    pub rss_file: u64,
    pub rss_shmem: u64,
    pub vm_data: u64,
    pub vm_stk: u64,
    pub vm_exe: u64,
    pub vm_lib: u64,
    pub vm_pte: u64,
    pub vm_swap: u64,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    // Uid has format: real effective saved fs
    let uid = match fields.get("Uid") {
        Some(line) => line
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::new("empty Uid line"))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid Uid: {}", line)))?,
        None => 0,
    };

    // Memory fields are in kB format: "12345 kB"
    let parse_kb = |key: &str| -> u64 {
        fields
            .get(key)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };

    Ok(ProcStatus {
        name: fields.get("Name").unwrap_or(&"").to_string(),
        uid,
        vm_peak: parse_kb("VmPeak"),
        vm_size: parse_kb("VmSize"),
        vm_lck: parse_kb("VmLck"),
        vm_pin: parse_kb("VmPin"),
        vm_hwm: parse_kb("VmHWM"),
        vm_rss: parse_kb("VmRSS"),
        rss_anon: parse_kb("RssAnon"),
        rss_file: parse_kb("RssFile"),
        rss_shmem: parse_kb("RssShmem"),
        vm_data: parse_kb("VmData"),
        vm_stk: parse_kb("VmStk"),
        vm_exe: parse_kb("VmExe"),
        vm_lib: parse_kb("VmLib"),
        vm_pte: parse_kb("VmPTE"),
        vm_swap: parse_kb("VmSwap"),
    })
}

/// Normalizes `/proc/[pid]/cmdline` content: NUL separators become spaces.
///
/// Returns an empty string for kernel threads.
pub fn parse_cmdline(content: &str) -> String {
    content.replace('\0', " ").trim().to_string()
}

/// Parses `/proc/meminfo` content into a map of KB values keyed by field name.
///
/// Lines without a numeric value are skipped.
pub fn parse_meminfo(content: &str) -> HashMap<String, u64> {
    let mut info = HashMap::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':')
            && let Some(Ok(kb)) = value.split_whitespace().next().map(str::parse::<u64>)
        {
            info.insert(key.trim().to_string(), kb);
        }
    }

    info
}

/// CPU lines from `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    /// Aggregate `cpu` line, if present.
    pub total: Option<CpuTimes>,
    /// `cpuN` lines in file order.
    pub cores: Vec<CpuTimes>,
}

/// Parses the CPU lines of `/proc/stat`.
///
/// Only the first eight columns are kept; guest time is already folded into
/// user/nice by the kernel.
pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, ParseError> {
    let mut stat = CpuStat::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(label) = parts.first() else {
            continue;
        };
        let Some(suffix) = label.strip_prefix("cpu") else {
            continue;
        };

        // user, nice, system and idle are present on every kernel
        if parts.len() < 5 {
            return Err(ParseError::new(format!("truncated cpu line: {}", line)));
        }

        let mut values = [0u64; CpuTimes::FIELDS];
        for (idx, value) in values.iter_mut().enumerate() {
            if let Some(raw) = parts.get(idx + 1) {
                *value = raw
                    .parse()
                    .map_err(|_| ParseError::new(format!("invalid cpu column: {}", line)))?;
            }
        }
        let times = CpuTimes::from_array(values);

        if suffix.is_empty() {
            stat.total = Some(times);
        } else if suffix.chars().all(|c| c.is_ascii_digit()) {
            stat.cores.push(times);
        }
    }

    Ok(stat)
}

/// Parses `/proc/uptime` content, returning seconds since boot.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAverage, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let one = parts[0]
        .parse()
        .map_err(|_| ParseError::new("invalid load1"))?;
    let five = parts[1]
        .parse()
        .map_err(|_| ParseError::new("invalid load5"))?;
    let fifteen = parts[2]
        .parse()
        .map_err(|_| ParseError::new("invalid load15"))?;

    Ok(LoadAverage { one, five, fifteen })
}

/// Parses `/etc/passwd` content and returns a map of UID -> username.
///
/// Format: username:password:uid:gid:gecos:home:shell
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3
            && let Ok(uid) = parts[2].parse::<u32>()
        {
            // First entry wins, like getpwuid
            map.entry(uid).or_insert_with(|| parts[0].to_string());
        }
    }
    map
}

/// Resolver for UID -> username mapping.
///
/// Caches the passwd file contents for efficient lookups.
#[derive(Debug, Clone, Default)]
pub struct UserResolver {
    uid_to_name: HashMap<u32, String>,
}

impl UserResolver {
    /// Creates a new empty resolver.
    pub fn new() -> Self {
        Self {
            uid_to_name: HashMap::new(),
        }
    }

    /// Loads user mappings from /etc/passwd content.
    pub fn load_from_content(&mut self, content: &str) {
        self.uid_to_name = parse_passwd(content);
    }

    /// Resolves UID to username, returns UID as string if not found.
    pub fn resolve(&self, uid: u32) -> String {
        self.uid_to_name
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }

    /// Returns true if resolver has any mappings.
    pub fn is_loaded(&self) -> bool {
        !self.uid_to_name.is_empty()
    }
}
