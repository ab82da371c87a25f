//! Shared time axis
//!
//! Finds the earliest and latest message across all threads so every thread
//! can be binned against the same windows.

use crate::types::Thread;
use chrono::NaiveDateTime;

/// Earliest first-message time and latest last-message time across `threads`.
///
/// Threads without messages are skipped. Returns `None` when no thread has any
/// messages.
pub fn conversation_bounds(threads: &[Thread]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    threads
        .iter()
        .filter_map(|t| Some((t.first_time()?, t.last_time()?)))
        .reduce(|(start, end), (first, last)| (start.min(first), end.max(last)))
}
