//! Chat archive adapters
//!
//! This module provides adapters that parse a single exported conversation file
//! and map it to a flat list of messages.

mod html;
mod json;

pub use html::HtmlArchiveAdapter;
pub use json::JsonArchiveAdapter;

use crate::error::PulseError;
use crate::types::{ArchiveFormat, Message, MessageOrder};
use std::path::Path;

/// Messages recovered from one conversation file
#[derive(Debug, Clone, Default)]
pub struct ParsedArchive {
    /// Successfully parsed messages, in source order
    pub messages: Vec<Message>,
    /// Message blocks that were malformed and skipped
    pub skipped_blocks: usize,
}

/// Trait for conversation archive adapters
pub trait ArchiveAdapter: Send + Sync {
    /// Format handled by this adapter
    fn format(&self) -> ArchiveFormat;

    /// File name this adapter reads inside a conversation directory
    fn file_name(&self) -> &str;

    /// Order in which this format lists messages
    fn source_order(&self) -> MessageOrder;

    /// Parse raw file contents. `source` is used for error reporting only.
    fn parse(&self, raw: &str, source: &Path) -> Result<ParsedArchive, PulseError>;
}

/// Adapters in lookup order: the first whose file exists wins
pub fn default_adapters() -> Vec<Box<dyn ArchiveAdapter>> {
    vec![
        Box::new(HtmlArchiveAdapter::default()),
        Box::new(JsonArchiveAdapter),
    ]
}
