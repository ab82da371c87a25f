//! Window binning
//!
//! Splits the shared time axis into equal, contiguous half-open windows and
//! counts each thread's messages per window with a single forward merge.

use crate::types::{Increment, Message, Thread, Window};
use chrono::NaiveDateTime;

/// Consecutive windows `[t, t + increment)` from `start`, keeping a window only
/// while its end does not pass `end`.
///
/// Cutoffs are measured from `start` itself, so month windows keep the start's
/// day-of-month wherever the calendar allows. A span shorter than one
/// increment yields no windows.
pub fn windows(start: NaiveDateTime, end: NaiveDateTime, increment: Increment) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut time = start;
    let mut steps = 1;

    while let Some(cutoff) = increment.step(start, steps) {
        if cutoff > end {
            break;
        }
        windows.push(Window {
            start: time,
            end: cutoff,
        });
        time = cutoff;
        steps += 1;
    }

    windows
}

/// Count messages per window.
///
/// `messages` must be sorted oldest first and `windows` ascending. A single
/// cursor walks the messages: for each window it consumes every message in
/// `[start, end)` and stops at the first message outside it. A message earlier
/// than the current window's start holds the cursor for good, so it and every
/// later message stay uncounted. Messages past the last window are left
/// uncounted too.
pub fn bin_messages(messages: &[Message], windows: &[Window]) -> Vec<u32> {
    let mut counts = vec![0u32; windows.len()];
    let mut cursor = 0;

    for (count, window) in counts.iter_mut().zip(windows) {
        while let Some(message) = messages.get(cursor) {
            if !window.contains(message.time) {
                break;
            }
            *count += 1;
            cursor += 1;
        }
    }

    counts
}

/// Bin a thread against the windows spanning `[start, end]`
pub fn bin_thread(
    thread: &Thread,
    start: NaiveDateTime,
    end: NaiveDateTime,
    increment: Increment,
) -> Vec<u32> {
    bin_messages(&thread.messages, &windows(start, end, increment))
}
