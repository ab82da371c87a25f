//! Pipeline orchestration
//!
//! This module provides the public API for Inbox Pulse. It runs the two
//! stages of a report:
//!
//! 1. Scan: read archives, keep owner threads, find bounds, bin every thread
//!    into a [`ScoreSnapshot`]
//! 2. Report: smooth the snapshot's counts into a [`ScoreMatrix`]

use crate::adapters::{default_adapters, ArchiveAdapter};
use crate::anonymize::NamePool;
use crate::binning::windows;
use crate::bounds::conversation_bounds;
use crate::error::PulseError;
use crate::loader::{load_threads, read_inbox};
use crate::matrix::{assemble, assemble_counts, count_rows, ReportOptions};
use crate::snapshot::ScoreSnapshot;
use crate::types::{Increment, ScoreMatrix, Thread};
use std::path::Path;
use tracing::info;

/// Default window width
pub const DEFAULT_INCREMENT: &str = "1d";

/// Scan a chat export into a snapshot of per-window message counts.
///
/// # Arguments
/// * `base_dir` - Export root containing `messages/inbox`
/// * `owner` - Display name of the person who exported the archive
/// * `increment` - Window width
///
/// # Example
/// ```ignore
/// let snapshot = scan_archive(Path::new("./facebook-export"), "Alice Smith", "7d".parse()?)?;
/// snapshot.save(Path::new("scores.json"))?;
/// ```
pub fn scan_archive(
    base_dir: &Path,
    owner: &str,
    increment: Increment,
) -> Result<ScoreSnapshot, PulseError> {
    PulseProcessor::new(owner, increment).scan(base_dir)
}

/// Smooth a snapshot into a report matrix with default options
pub fn build_report(snapshot: &ScoreSnapshot) -> Result<ScoreMatrix, PulseError> {
    report_snapshot(snapshot, &ReportOptions::default())
}

/// Smooth a snapshot into a report matrix
pub fn report_snapshot(
    snapshot: &ScoreSnapshot,
    options: &ReportOptions,
) -> Result<ScoreMatrix, PulseError> {
    let windows = snapshot.windows();
    let matrix = assemble_counts(&snapshot.rows, &windows, options)?;
    info!(
        rows = matrix.rows.len(),
        windows = matrix.window_count(),
        "Assembled score matrix"
    );
    Ok(matrix)
}

/// Configurable processor for scanning exports and building reports
pub struct PulseProcessor {
    owner: String,
    increment: Increment,
    name_pool: Option<NamePool>,
    adapters: Vec<Box<dyn ArchiveAdapter>>,
    report_options: ReportOptions,
}

impl PulseProcessor {
    /// Create a processor for `owner` with default adapters and report options
    pub fn new(owner: impl Into<String>, increment: Increment) -> Self {
        Self {
            owner: owner.into(),
            increment,
            name_pool: None,
            adapters: default_adapters(),
            report_options: ReportOptions::default(),
        }
    }

    /// Replace counterpart names with names drawn from `pool`
    pub fn with_name_pool(mut self, pool: NamePool) -> Self {
        self.name_pool = Some(pool);
        self
    }

    pub fn with_smoothing_window(mut self, smoothing_window: usize) -> Self {
        self.report_options.smoothing_window = smoothing_window;
        self
    }

    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.report_options = options;
        self
    }

    /// Use a custom adapter list, tried in order for each conversation
    pub fn with_adapters(mut self, adapters: Vec<Box<dyn ArchiveAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    /// Load the owner's two-party threads from an export
    pub fn load(&mut self, base_dir: &Path) -> Result<Vec<Thread>, PulseError> {
        let conversations = read_inbox(base_dir, &self.adapters)?;
        let threads = load_threads(conversations, &self.owner, self.name_pool.as_mut())?;
        if threads.is_empty() {
            return Err(PulseError::NoConversations(self.owner.clone()));
        }
        Ok(threads)
    }

    /// Run the scan stage
    pub fn scan(&mut self, base_dir: &Path) -> Result<ScoreSnapshot, PulseError> {
        let threads = self.load(base_dir)?;
        self.snapshot_threads(&threads)
    }

    /// Bin already-loaded threads into a snapshot
    pub fn snapshot_threads(&self, threads: &[Thread]) -> Result<ScoreSnapshot, PulseError> {
        let (start, end) = conversation_bounds(threads)
            .ok_or_else(|| PulseError::NoConversations(self.owner.clone()))?;

        let windows = windows(start, end, self.increment);
        info!(
            %start,
            %end,
            increment = %self.increment,
            windows = windows.len(),
            "Binning threads"
        );

        let rows = count_rows(threads, &windows);
        Ok(ScoreSnapshot::new(rows, start, end, self.increment))
    }

    /// Run the report stage on a snapshot
    pub fn report(&self, snapshot: &ScoreSnapshot) -> Result<ScoreMatrix, PulseError> {
        report_snapshot(snapshot, &self.report_options)
    }

    /// Bin and smooth already-loaded threads in one step
    pub fn score_threads(&self, threads: &[Thread]) -> Result<ScoreMatrix, PulseError> {
        let (start, end) = conversation_bounds(threads)
            .ok_or_else(|| PulseError::NoConversations(self.owner.clone()))?;
        assemble(threads, start, end, self.increment, &self.report_options)
    }
}
