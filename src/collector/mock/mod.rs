//! Mock filesystem for testing without a real `/proc`.

mod filesystem;
mod scenarios;

pub use filesystem::{MockFs, stat_line};
