//! procsnap - live Linux process and system telemetry.
//!
//! Provides:
//! - `collector` - typed raw counter readers over `/proc` (real or mocked)
//! - `delta` - percentage derivation from two counter readings
//! - `sampler` - one full collection pass producing a `Snapshot`
//! - `store` - thread-safe holder of the latest snapshot
//! - `poller` - cancellable fixed-cadence background loop
//! - `threads` - on-demand thread loading merged into the store
//! - `monitor` - consumer facade wiring the pieces above
//! - `config` - monitor settings
//! - `fmt` - shared formatting helpers (start time, sizes, durations)
//! - `model` - snapshot data types

pub mod collector;
pub mod config;
pub mod delta;
pub mod fmt;
pub mod model;
pub mod monitor;
pub mod poller;
pub mod sampler;
pub mod store;
pub mod threads;

pub use config::{ConfigError, MonitorConfig};
pub use model::{GlobalSample, ProcessSample, ProcessState, Snapshot, ThreadSample};
pub use monitor::Monitor;
pub use poller::PollerState;
