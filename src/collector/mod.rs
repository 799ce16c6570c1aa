//! Raw counter readers for Linux.
//!
//! This module provides typed access to the kernel counters exposed through
//! the `/proc` filesystem. `MockFs` stands in for it in unit tests and in the
//! daemon's fallback off Linux.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                ProcfsSource  (impl RawSource)               │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ProcessCollector   │   │     SystemCollector         │  │
//! │  │  - /proc/[pid]/*    │   │  - /proc/stat               │  │
//! │  │  - /proc/[pid]/task │   │  - /proc/meminfo            │  │
//! │  └──────────┬──────────┘   │  - /proc/uptime, loadavg    │  │
//! │             │              └──────────────┬──────────────┘  │
//! │             └──────────────┬──────────────┘                 │
//! │                     ┌──────▼──────┐                         │
//! │                     │  FileSystem │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!              ┌───────────────┼───────────────┐
//!       ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use procsnap::collector::{MockFs, ProcfsSource, RawSource};
//!
//! let source = ProcfsSource::new(MockFs::typical_system(), "/proc", "/etc/passwd");
//! let pids = source.list_process_ids().unwrap();
//! assert_eq!(pids.len(), 3);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use collector::{DEFAULT_CLOCK_HZ, ProcfsSource};
pub use mock::MockFs;
pub use procfs::{CollectError, ProcessRaw, ThreadRaw, UserResolver};
pub use traits::{FileSystem, RawSource, RealFs};
