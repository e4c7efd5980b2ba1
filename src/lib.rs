//! covx - Code Climate coverage from CI
//!
//! A library for driving the Code Climate test reporter inside a CI job:
//! - Discovery of coverage reports by glob pattern
//! - Per-file formatting with deterministic output names
//! - Summing into one report and uploading it
//! - Commit and branch resolution from overlapping CI signals

pub mod config;
pub mod console;
pub mod download;
pub mod environment;
pub mod error;
pub mod exec;
pub mod matcher;
pub mod reporter;

#[cfg(test)]
mod testing;

pub use config::{parse_patterns, Config, Options};
pub use environment::{resolve, EnvironmentContext, Signals};
pub use error::ReporterError;
pub use exec::{Executor, Invocation, ProcessExecutor};
pub use matcher::{GlobMatcher, PatternMatcher};
pub use reporter::{CodeClimate, PatternAndType, ReporterEvent};
