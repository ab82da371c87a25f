//! Conversation loading
//!
//! Reads every conversation directory under `<base>/messages/inbox`, parses it
//! with the first adapter whose file is present, and keeps only two-party
//! conversations that include the report owner.

use crate::adapters::{ArchiveAdapter, ParsedArchive};
use crate::anonymize::NamePool;
use crate::error::PulseError;
use crate::types::{Message, MessageOrder, RawConversation, Thread};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Location of the conversation directories relative to the export root
pub fn inbox_path(base_dir: &Path) -> PathBuf {
    base_dir.join("messages").join("inbox")
}

/// Read all conversations in an export.
///
/// Conversations are returned in directory-name order. A conversation that
/// cannot be read or parsed is logged and left out; only a missing inbox is
/// an error.
pub fn read_inbox(
    base_dir: &Path,
    adapters: &[Box<dyn ArchiveAdapter>],
) -> Result<Vec<RawConversation>, PulseError> {
    let inbox = inbox_path(base_dir);
    if !inbox.is_dir() {
        return Err(PulseError::MissingInbox(inbox));
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(&inbox)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable inbox entry");
                continue;
            }
        };
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_dir() && !hidden {
            dirs.push(entry.into_path());
        }
    }

    let total = dirs.len();
    let results: Vec<(PathBuf, Result<RawConversation, PulseError>)> = dirs
        .into_par_iter()
        .map(|dir| {
            let result = read_conversation(&dir, adapters);
            (dir, result)
        })
        .collect();

    let mut conversations = Vec::with_capacity(total);
    for (i, (dir, result)) in results.into_iter().enumerate() {
        match result {
            Ok(conversation) => {
                info!(
                    "({} / {}) Loaded {} ({} messages, {})",
                    i + 1,
                    total,
                    conversation.id,
                    conversation.messages.len(),
                    conversation.format.as_str()
                );
                conversations.push(conversation);
            }
            Err(e) => warn!(conversation = %dir.display(), error = %e, "Skipping conversation"),
        }
    }

    Ok(conversations)
}

/// Read one conversation directory with the first adapter whose file exists
pub fn read_conversation(
    dir: &Path,
    adapters: &[Box<dyn ArchiveAdapter>],
) -> Result<RawConversation, PulseError> {
    let id = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for adapter in adapters {
        let path = dir.join(adapter.file_name());
        if !path.is_file() {
            continue;
        }

        let raw = fs::read_to_string(&path)?;
        let ParsedArchive {
            messages,
            skipped_blocks,
        } = adapter.parse(&raw, &path)?;

        if skipped_blocks > 0 {
            debug!(conversation = %id, skipped_blocks, "Skipped malformed message blocks");
        }

        return Ok(RawConversation {
            id,
            format: adapter.format(),
            messages,
            order: adapter.source_order(),
            skipped_blocks,
        });
    }

    Err(PulseError::MissingMessageFile(dir.to_path_buf()))
}

/// Filter conversations down to owner threads and resolve counterpart names.
///
/// A conversation is kept only when it has exactly two distinct authors and
/// one of them is `owner`. When `names` is given, each kept counterpart is
/// replaced by the next name in the pool; a pool too small for every kept
/// thread is an error before any name is drawn.
pub fn load_threads(
    conversations: Vec<RawConversation>,
    owner: &str,
    mut names: Option<&mut NamePool>,
) -> Result<Vec<Thread>, PulseError> {
    let mut kept = Vec::new();
    for conversation in conversations {
        let id = conversation.id.clone();
        match owner_thread(conversation, owner) {
            Some(thread) => kept.push(thread),
            None => debug!(conversation = %id, "Not a two-party conversation with owner"),
        }
    }

    if let Some(pool) = names.as_deref() {
        pool.reserve(kept.len())?;
    }

    let mut threads = Vec::with_capacity(kept.len());
    for (counterpart, messages) in kept {
        let name = match names.as_deref_mut() {
            Some(pool) => pool.draw()?,
            None => counterpart,
        };
        threads.push(Thread { name, messages });
    }

    info!(threads = threads.len(), "Loaded two-party threads");
    Ok(threads)
}

/// Chronologically ordered messages and the counterpart identity, if this is
/// a two-party conversation that includes `owner`
fn owner_thread(conversation: RawConversation, owner: &str) -> Option<(String, Vec<Message>)> {
    let RawConversation {
        mut messages,
        order,
        ..
    } = conversation;

    let participants: BTreeSet<&str> = messages.iter().map(|m| m.author.as_str()).collect();
    if participants.len() != 2 || !participants.contains(owner) {
        return None;
    }
    let counterpart = participants.into_iter().find(|p| *p != owner)?.to_string();

    if order == MessageOrder::NewestFirst {
        messages.reverse();
    }
    // Stable, so same-minute messages keep their export order
    messages.sort_by_key(|m| m.time);

    Some((counterpart, messages))
}
