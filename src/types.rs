//! Core types for the Inbox Pulse pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: parsed messages and threads, time windows and the increment that
//! sizes them, per-thread count rows, and the final smoothed score matrix.

use crate::error::PulseError;
use chrono::{Duration, Months, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// When the message was sent (export-local wall clock)
    pub time: NaiveDateTime,
    /// Display name of the sender
    pub author: String,
    /// Message text; carried along but never inspected by the pipeline
    pub body: String,
}

/// Order in which an archive lists its messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    OldestFirst,
    NewestFirst,
}

/// Archive format a conversation was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Html,
    Json,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Html => "html",
            ArchiveFormat::Json => "json",
        }
    }
}

/// One conversation as read from disk, before participant filtering
#[derive(Debug, Clone)]
pub struct RawConversation {
    /// Conversation directory name
    pub id: String,
    /// Source format
    pub format: ArchiveFormat,
    /// Messages in source order
    pub messages: Vec<Message>,
    /// Source ordering of `messages`
    pub order: MessageOrder,
    /// Message blocks that could not be parsed and were skipped
    pub skipped_blocks: usize,
}

/// A two-party conversation between the report owner and one counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    /// Resolved counterpart identity (possibly anonymized)
    pub name: String,
    /// Messages sorted oldest first
    pub messages: Vec<Message>,
}

impl Thread {
    /// Time of the oldest message, if any
    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.messages.first().map(|m| m.time)
    }

    /// Time of the newest message, if any
    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.messages.last().map(|m| m.time)
    }
}

/// Unit of a window increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncrementUnit {
    Hours,
    Days,
    /// Calendar months; day-of-month is clamped to the target month's length
    Months,
}

impl IncrementUnit {
    fn suffix(&self) -> char {
        match self {
            IncrementUnit::Hours => 'h',
            IncrementUnit::Days => 'd',
            IncrementUnit::Months => 'm',
        }
    }
}

static INCREMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([hdm])$").expect("increment pattern is valid"));

/// Width of one binning window, written `<n><unit>` (e.g. `1d`, `12h`, `3m`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Increment {
    amount: u32,
    unit: IncrementUnit,
}

impl Increment {
    /// Create an increment; the amount must be at least 1
    pub fn new(amount: u32, unit: IncrementUnit) -> Result<Self, PulseError> {
        if amount == 0 {
            return Err(PulseError::InvalidIncrement(format!(
                "{}{}",
                amount,
                unit.suffix()
            )));
        }
        Ok(Self { amount, unit })
    }

    pub fn hours(amount: u32) -> Result<Self, PulseError> {
        Self::new(amount, IncrementUnit::Hours)
    }

    pub fn days(amount: u32) -> Result<Self, PulseError> {
        Self::new(amount, IncrementUnit::Days)
    }

    pub fn months(amount: u32) -> Result<Self, PulseError> {
        Self::new(amount, IncrementUnit::Months)
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn unit(&self) -> IncrementUnit {
        self.unit
    }

    /// `anchor` moved forward by `count` increments in one jump, `None` on
    /// overflow.
    ///
    /// Month steps clamp only the final day-of-month, so the anchor's day is
    /// kept for later steps (Jan 31 + 2 months is Mar 31, not Mar 28).
    pub fn step(&self, anchor: NaiveDateTime, count: u32) -> Option<NaiveDateTime> {
        let amount = self.amount.checked_mul(count)?;
        match self.unit {
            IncrementUnit::Hours => anchor.checked_add_signed(Duration::hours(i64::from(amount))),
            IncrementUnit::Days => anchor.checked_add_signed(Duration::days(i64::from(amount))),
            IncrementUnit::Months => anchor.checked_add_months(Months::new(amount)),
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for Increment {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PulseError::InvalidIncrement(s.to_string());
        let caps = INCREMENT_PATTERN.captures(s.trim()).ok_or_else(invalid)?;
        let amount: u32 = caps[1].parse().map_err(|_| invalid())?;
        let unit = match &caps[2] {
            "h" => IncrementUnit::Hours,
            "d" => IncrementUnit::Days,
            "m" => IncrementUnit::Months,
            _ => return Err(invalid()),
        };
        Self::new(amount, unit).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Increment {
    type Error = PulseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Increment> for String {
    fn from(value: Increment) -> Self {
        value.to_string()
    }
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time < self.end
    }

    /// Column label for this window: its end date rendered with `date_format`
    pub fn label(&self, date_format: &str) -> String {
        self.end.format(date_format).to_string()
    }
}

/// Raw per-window message counts for one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    /// Resolved counterpart identity
    pub name: String,
    /// One count per window, in window order
    pub counts: Vec<u32>,
}

impl CountRow {
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Smoothed activity for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub name: String,
    /// One smoothed value per window, in window order
    pub values: Vec<f64>,
}

/// Aligned table of smoothed activity: one row per conversation, one column per window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    /// Window labels, ascending
    pub labels: Vec<String>,
    /// Retained rows, each with exactly `labels.len()` values
    pub rows: Vec<ScoreRow>,
}

impl ScoreMatrix {
    pub fn window_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_increment() {
        assert_eq!("1h".parse::<Increment>().unwrap(), Increment::hours(1).unwrap());
        assert_eq!("7d".parse::<Increment>().unwrap(), Increment::days(7).unwrap());
        assert_eq!("3m".parse::<Increment>().unwrap(), Increment::months(3).unwrap());
    }

    #[test]
    fn test_parse_increment_rejects_bad_syntax() {
        for bad in ["", "d", "1", "1w", "-1d", "1.5d", "0d", "1 d", "d1"] {
            let err = bad.parse::<Increment>().unwrap_err();
            assert!(
                matches!(err, PulseError::InvalidIncrement(_)),
                "expected InvalidIncrement for {bad:?}"
            );
        }
    }

    #[test]
    fn test_increment_display_roundtrip() {
        let inc = Increment::days(14).unwrap();
        assert_eq!(inc.to_string(), "14d");
        assert_eq!(inc.to_string().parse::<Increment>().unwrap(), inc);
    }

    #[test]
    fn test_increment_serde_as_string() {
        let inc = Increment::hours(6).unwrap();
        let json = serde_json::to_string(&inc).unwrap();
        assert_eq!(json, "\"6h\"");
        let back: Increment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inc);
        assert!(serde_json::from_str::<Increment>("\"6x\"").is_err());
    }

    #[test]
    fn test_step_months_clamps_day() {
        let inc = Increment::months(1).unwrap();
        assert_eq!(inc.step(at(2021, 1, 31), 1), Some(at(2021, 2, 28)));
        assert_eq!(inc.step(at(2021, 2, 1), 1), Some(at(2021, 3, 1)));
    }

    #[test]
    fn test_step_keeps_anchor_day() {
        let inc = Increment::months(1).unwrap();
        let anchor = at(2021, 1, 31);
        assert_eq!(inc.step(anchor, 1), Some(at(2021, 2, 28)));
        assert_eq!(inc.step(anchor, 2), Some(at(2021, 3, 31)));
        assert_eq!(inc.step(anchor, 3), Some(at(2021, 4, 30)));
        assert_eq!(inc.step(anchor, 0), Some(anchor));

        let days = Increment::days(3).unwrap();
        assert_eq!(days.step(at(2021, 1, 1), 4), Some(at(2021, 1, 13)));
        assert_eq!(days.step(at(2021, 1, 1), u32::MAX), None);
    }

    #[test]
    fn test_step_hours_and_days() {
        let start = at(2021, 1, 1);
        assert_eq!(
            Increment::hours(36).unwrap().step(start, 1),
            Some(at(2021, 1, 2) + Duration::hours(12))
        );
        assert_eq!(Increment::days(7).unwrap().step(start, 1), Some(at(2021, 1, 8)));
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let w = Window {
            start: at(2021, 1, 1),
            end: at(2021, 1, 8),
        };
        assert!(w.contains(at(2021, 1, 1)));
        assert!(w.contains(at(2021, 1, 7)));
        assert!(!w.contains(at(2021, 1, 8)));
        assert_eq!(w.label("%b %d, %Y"), "Jan 08, 2021");
    }
}
