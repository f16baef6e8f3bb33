//! Batch worker for trimming noisy recording tails.
//!
//! This crate provides:
//! - Command-line parsing and validated run configuration
//! - The per-file pipeline (probe, loudness trace, detection, trim)
//! - A bounded batch executor with Ctrl-C handling
//! - Summary table and JSON reporting

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;
pub mod report;

pub use cli::{Cli, FfmpegLogLevel, LogLevel};
pub use config::{InputConfig, TrimmerConfig};
pub use error::{is_fatal_error, WorkerError, WorkerResult};
pub use executor::BatchExecutor;
pub use logging::{init_tracing, FileLogger};
pub use processor::{process_file, ProcessingContext};
pub use report::{render_summary, render_table, write_json_report, BatchReport};
