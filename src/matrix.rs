//! Score matrix assembly
//!
//! Bins and smooths every thread against one shared set of windows and joins
//! the results into a single aligned table.

use crate::binning::{bin_messages, windows};
use crate::error::PulseError;
use crate::smoothing::{smooth, DEFAULT_SMOOTHING_WINDOW};
use crate::types::{CountRow, Increment, ScoreMatrix, ScoreRow, Thread, Window};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::debug;

/// Identity exports use for deactivated or removed accounts
pub const PLACEHOLDER_IDENTITY: &str = "Facebook User";

/// Date format for window column labels, e.g. `Jan 08, 2021`
pub const DEFAULT_DATE_FORMAT: &str = "%b %d, %Y";

/// Options for turning counts into a score matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Number of windows averaged by the trailing moving average
    pub smoothing_window: usize,
    /// Identities never emitted as rows
    pub excluded_identities: Vec<String>,
    /// `strftime` format for window labels
    pub date_format: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            excluded_identities: vec![PLACEHOLDER_IDENTITY.to_string()],
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl ReportOptions {
    pub fn with_smoothing_window(mut self, smoothing_window: usize) -> Self {
        self.smoothing_window = smoothing_window;
        self
    }

    /// Reject options no report can be built with
    pub fn validate(&self) -> Result<(), PulseError> {
        if self.smoothing_window == 0 {
            return Err(PulseError::InvalidConfig(
                "smoothing window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excluded_identities.iter().any(|e| e == name)
    }
}

/// Count each thread's messages per window. Row order follows `threads`.
pub fn count_rows(threads: &[Thread], windows: &[Window]) -> Vec<CountRow> {
    threads
        .par_iter()
        .map(|thread| CountRow {
            name: thread.name.clone(),
            counts: bin_messages(&thread.messages, windows),
        })
        .collect()
}

/// Bin, smooth and join `threads` over the windows spanning `[start, end]`
pub fn assemble(
    threads: &[Thread],
    start: NaiveDateTime,
    end: NaiveDateTime,
    increment: Increment,
    options: &ReportOptions,
) -> Result<ScoreMatrix, PulseError> {
    let windows = windows(start, end, increment);
    let rows = count_rows(threads, &windows);
    assemble_counts(&rows, &windows, options)
}

/// Smooth pre-binned count rows and join them into a matrix.
///
/// Rows with an excluded identity are dropped. Any remaining row whose length
/// differs from the number of windows is an error: nothing is truncated or
/// padded.
pub fn assemble_counts(
    rows: &[CountRow],
    windows: &[Window],
    options: &ReportOptions,
) -> Result<ScoreMatrix, PulseError> {
    options.validate()?;

    let labels: Vec<String> = windows
        .iter()
        .map(|w| w.label(&options.date_format))
        .collect();

    let mut scored = Vec::with_capacity(rows.len());
    for row in rows {
        if options.is_excluded(&row.name) {
            debug!(name = %row.name, "Excluding placeholder identity");
            continue;
        }
        if row.counts.len() != labels.len() {
            return Err(PulseError::MisalignedSeries {
                name: row.name.clone(),
                expected: labels.len(),
                actual: row.counts.len(),
            });
        }
        scored.push(ScoreRow {
            name: row.name.clone(),
            values: smooth(&row.counts, options.smoothing_window)?,
        });
    }

    Ok(ScoreMatrix {
        labels,
        rows: scored,
    })
}
