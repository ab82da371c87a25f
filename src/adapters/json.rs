//! JSON archive adapter
//!
//! Reads the newer `message_1.json` export. Messages carry a sender name and a
//! millisecond epoch timestamp and are listed newest first. Text fields in
//! these exports are UTF-8 bytes escaped as Latin-1 code points, so they are
//! re-decoded before use.

use super::{ArchiveAdapter, ParsedArchive};
use crate::error::PulseError;
use crate::types::{ArchiveFormat, Message, MessageOrder};
use chrono::DateTime;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Adapter for JSON conversation exports
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArchiveAdapter;

#[derive(Debug, Deserialize)]
struct JsonArchive {
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JsonMessage {
    sender_name: String,
    timestamp_ms: i64,
    #[serde(default)]
    content: Option<String>,
}

impl ArchiveAdapter for JsonArchiveAdapter {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Json
    }

    fn file_name(&self) -> &str {
        "message_1.json"
    }

    fn source_order(&self) -> MessageOrder {
        MessageOrder::NewestFirst
    }

    fn parse(&self, raw: &str, source: &Path) -> Result<ParsedArchive, PulseError> {
        let archive: JsonArchive =
            serde_json::from_str(raw).map_err(|e| PulseError::ArchiveParse {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut parsed = ParsedArchive::default();

        for value in archive.messages {
            let message = match serde_json::from_value::<JsonMessage>(value) {
                Ok(message) => message,
                Err(e) => {
                    debug!(error = %e, "Skipping malformed JSON message");
                    parsed.skipped_blocks += 1;
                    continue;
                }
            };

            let Some(time) = DateTime::from_timestamp_millis(message.timestamp_ms) else {
                debug!(timestamp_ms = message.timestamp_ms, "Timestamp out of range");
                parsed.skipped_blocks += 1;
                continue;
            };

            parsed.messages.push(Message {
                time: time.naive_utc(),
                author: repair_mojibake(&message.sender_name),
                body: message.content.as_deref().map(repair_mojibake).unwrap_or_default(),
            });
        }

        Ok(parsed)
    }
}

/// Undo Latin-1 escaping of UTF-8 text. Strings that are not representable
/// that way are returned unchanged.
pub fn repair_mojibake(text: &str) -> String {
    let bytes: Option<Vec<u8>> = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect();

    match bytes.map(String::from_utf8) {
        Some(Ok(repaired)) => repaired,
        _ => text.to_string(),
    }
}
