//! Readers for the Linux `/proc` filesystem.
//!
//! This module provides parsers and readers for system and process
//! information exposed by the `/proc` virtual filesystem.

pub mod parser;
pub mod process;
pub mod system;

pub use parser::UserResolver;
pub use process::{CollectError, ProcessCollector, ProcessRaw, ThreadRaw};
pub use system::SystemCollector;
