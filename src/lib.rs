//! Inbox Pulse - activity time series from exported chat archives
//!
//! Pulse turns a chat export into a per-conversation activity report through a
//! deterministic pipeline: archive adaptation → two-party thread filtering →
//! shared time bounds → window binning → moving-average smoothing → CSV.
//!
//! ## Stages
//!
//! - **Scan**: read every conversation and bin it into a [`ScoreSnapshot`]
//! - **Report**: smooth a snapshot into a [`ScoreMatrix`] and write it as CSV

pub mod adapters;
pub mod anonymize;
pub mod binning;
pub mod bounds;
pub mod error;
pub mod loader;
pub mod matrix;
pub mod pipeline;
pub mod report;
pub mod smoothing;
pub mod snapshot;
pub mod types;

pub use anonymize::NamePool;
pub use error::PulseError;
pub use matrix::{ReportOptions, PLACEHOLDER_IDENTITY};
pub use pipeline::{build_report, report_snapshot, scan_archive, PulseProcessor};
pub use report::CsvReportWriter;
pub use snapshot::ScoreSnapshot;
pub use types::{Increment, Message, ScoreMatrix, Thread, Window};

/// Pulse version recorded in every snapshot
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name recorded in every snapshot
pub const PRODUCER_NAME: &str = "inbox-pulse";
