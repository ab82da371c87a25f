//! Score snapshots
//!
//! The scan stage is slow (it reads every archive); the report stage is cheap.
//! A [`ScoreSnapshot`] holds everything the report stage needs so reports can
//! be rebuilt with different options without rescanning.

use crate::binning::windows;
use crate::error::PulseError;
use crate::types::{CountRow, Increment, Window};
use crate::{PRODUCER_NAME, PULSE_VERSION};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Who produced a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    /// Unique id of the scan run
    pub run_id: String,
}

impl SnapshotProducer {
    fn current() -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: PULSE_VERSION.to_string(),
            run_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Raw per-window counts for every thread, plus the time axis they align to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub producer: SnapshotProducer,
    pub computed_at: DateTime<Utc>,
    /// Earliest message across all threads
    pub start: NaiveDateTime,
    /// Latest message across all threads
    pub end: NaiveDateTime,
    pub increment: Increment,
    pub rows: Vec<CountRow>,
}

impl ScoreSnapshot {
    pub fn new(
        rows: Vec<CountRow>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        increment: Increment,
    ) -> Self {
        Self {
            producer: SnapshotProducer::current(),
            computed_at: Utc::now(),
            start,
            end,
            increment,
            rows,
        }
    }

    /// Windows the rows are aligned to
    pub fn windows(&self) -> Vec<Window> {
        windows(self.start, self.end, self.increment)
    }

    /// Check that every row has one count per window
    pub fn validate(&self) -> Result<(), PulseError> {
        let expected = self.windows().len();
        match self.rows.iter().find(|r| r.counts.len() != expected) {
            Some(row) => Err(PulseError::MisalignedSeries {
                name: row.name.clone(),
                expected,
                actual: row.counts.len(),
            }),
            None => Ok(()),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, PulseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate
    pub fn from_json(json: &str) -> Result<Self, PulseError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), PulseError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PulseError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
