//! HTML archive adapter
//!
//! Reads the legacy `message_1.html` export. Each message is a `div.pam` block
//! holding the author (`div._2pio`), the body (`div._2let`) and a human-readable
//! timestamp (`div._2lem`). Messages are listed newest first.

use super::{ArchiveAdapter, ParsedArchive};
use crate::error::PulseError;
use crate::types::{ArchiveFormat, Message, MessageOrder};
use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Timestamp format used by the HTML export, e.g. `Jan 05, 2021, 3:07 PM`
pub const HTML_TIME_FORMAT: &str = "%b %d, %Y, %I:%M %p";

static DIV_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<div\s+class="([^"]*)"[^>]*>"#).expect("div pattern is valid"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

/// Adapter for HTML conversation exports
#[derive(Debug, Clone)]
pub struct HtmlArchiveAdapter {
    file_name: String,
    block_class: String,
    author_class: String,
    body_class: String,
    time_class: String,
    time_format: String,
}

impl Default for HtmlArchiveAdapter {
    fn default() -> Self {
        Self {
            file_name: "message_1.html".to_string(),
            block_class: "pam".to_string(),
            author_class: "_2pio".to_string(),
            body_class: "_2let".to_string(),
            time_class: "_2lem".to_string(),
            time_format: HTML_TIME_FORMAT.to_string(),
        }
    }
}

/// A `<div class="...">` opening tag located in the document
struct DivTag<'a> {
    classes: &'a str,
    start: usize,
    end: usize,
}

impl DivTag<'_> {
    fn has_class(&self, class: &str) -> bool {
        self.classes.split_whitespace().any(|c| c == class)
    }
}

impl HtmlArchiveAdapter {
    /// Override the timestamp format (for exports rendered in another locale)
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }

    /// Parse one message block spanning `tags` (the block's own tag first) and
    /// ending at byte offset `block_end`. Returns `None` when a part is missing
    /// or the timestamp does not parse.
    fn parse_block(&self, html: &str, tags: &[DivTag<'_>], block_end: usize) -> Option<Message> {
        let author_tag = tags.iter().find(|t| t.has_class(&self.author_class))?;
        let body_tag = tags.iter().find(|t| t.has_class(&self.body_class))?;
        let time_tag = tags.iter().find(|t| t.has_class(&self.time_class))?;

        let author = text_of(first_div_content(html, author_tag.end, block_end));
        let time_text = text_of(first_div_content(html, time_tag.end, block_end));

        // The body nests further divs; it runs until the timestamp div opens.
        let body_end = if time_tag.start > body_tag.end {
            time_tag.start
        } else {
            block_end
        };
        let body = text_of(&html[body_tag.end..body_end]);

        let time = match NaiveDateTime::parse_from_str(&time_text, &self.time_format) {
            Ok(time) => time,
            Err(e) => {
                debug!(timestamp = %time_text, error = %e, "Unparseable message timestamp");
                return None;
            }
        };

        Some(Message { time, author, body })
    }
}

impl ArchiveAdapter for HtmlArchiveAdapter {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Html
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn source_order(&self) -> MessageOrder {
        MessageOrder::NewestFirst
    }

    fn parse(&self, raw: &str, _source: &Path) -> Result<ParsedArchive, PulseError> {
        let tags: Vec<DivTag<'_>> = DIV_OPEN
            .captures_iter(raw)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let classes = caps.get(1)?.as_str();
                Some(DivTag {
                    classes,
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect();

        let block_starts: Vec<usize> = tags
            .iter()
            .enumerate()
            .filter(|(_, t)| t.has_class(&self.block_class))
            .map(|(i, _)| i)
            .collect();

        let mut parsed = ParsedArchive::default();

        for (n, &first) in block_starts.iter().enumerate() {
            let last = block_starts.get(n + 1).copied().unwrap_or(tags.len());
            let block_end = tags.get(last).map(|t| t.start).unwrap_or(raw.len());

            match self.parse_block(raw, &tags[first..last], block_end) {
                Some(message) => parsed.messages.push(message),
                None => parsed.skipped_blocks += 1,
            }
        }

        Ok(parsed)
    }
}

/// Content between an opening tag (ending at `from`) and the next `</div>`
fn first_div_content(html: &str, from: usize, limit: usize) -> &str {
    let region = &html[from..limit];
    match region.find("</div>") {
        Some(close) => &region[..close],
        None => region,
    }
}

/// Visible text of an HTML fragment: tags removed, entities decoded, trimmed
fn text_of(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    decode_entities(stripped.trim())
}

/// Decode named and numeric HTML character references
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn block(author: &str, body: &str, time: &str) -> String {
        format!(
            r#"<div class="pam _3-95 _2pi0 _2lej uiBoxWhite noborder"><div class="_3-96 _2pio _2lek _2lel">{author}</div><div class="_3-96 _2let"><div><div></div><div>{body}</div><div></div><div></div></div></div><div class="_3-94 _2lem">{time}</div></div>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!(
            r#"<html><head><title>Bob Jones</title></head><body><div class="_4t5n" role="main">{}</div></body></html>"#,
            blocks.join("")
        )
    }

    fn parse(html: &str) -> ParsedArchive {
        HtmlArchiveAdapter::default()
            .parse(html, Path::new("message_1.html"))
            .unwrap()
    }

    #[test]
    fn test_parses_message_blocks_in_source_order() {
        let html = page(&[
            block("Bob Jones", "later", "Jan 10, 2021, 9:15 PM"),
            block("Alice Smith", "hi there", "Jan 05, 2021, 3:07 AM"),
        ]);

        let parsed = parse(&html);
        assert_eq!(parsed.skipped_blocks, 0);
        assert_eq!(parsed.messages.len(), 2);

        let first = &parsed.messages[0];
        assert_eq!(first.author, "Bob Jones");
        assert_eq!(first.body, "later");
        assert_eq!(
            first.time,
            NaiveDate::from_ymd_opt(2021, 1, 10)
                .unwrap()
                .and_hms_opt(21, 15, 0)
                .unwrap()
        );
        assert_eq!(parsed.messages[1].author, "Alice Smith");
        assert_eq!(parsed.messages[1].body, "hi there");
    }

    #[test]
    fn test_skips_malformed_blocks() {
        let missing_time = r#"<div class="pam"><div class="_2pio">Bob</div><div class="_2let">x</div></div>"#;
        let html = page(&[
            missing_time.to_string(),
            block("Bob", "bad time", "yesterday"),
            block("Alice", "ok", "Feb 01, 2020, 12:00 PM"),
        ]);

        let parsed = parse(&html);
        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(parsed.skipped_blocks, 2);
        assert_eq!(parsed.messages[0].author, "Alice");
    }

    #[test]
    fn test_decodes_entities_in_author_and_body() {
        let html = page(&[block(
            "Sin&#233;ad O&#039;Brien",
            "fish &amp; chips &lt;3",
            "Mar 03, 2019, 1:00 PM",
        )]);

        let parsed = parse(&html);
        assert_eq!(parsed.messages[0].author, "Sinéad O'Brien");
        assert_eq!(parsed.messages[0].body, "fish & chips <3");
    }

    #[test]
    fn test_custom_time_format() {
        let html = page(&[block("Bob", "hi", "2021-01-05 15:07")]);

        assert_eq!(parse(&html).skipped_blocks, 1);

        let parsed = HtmlArchiveAdapter::default()
            .with_time_format("%Y-%m-%d %H:%M")
            .parse(&html, Path::new("message_1.html"))
            .unwrap();
        assert_eq!(parsed.skipped_blocks, 0);
        assert_eq!(
            parsed.messages[0].time,
            NaiveDate::from_ymd_opt(2021, 1, 5)
                .unwrap()
                .and_hms_opt(15, 7, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_empty_document() {
        let parsed = parse("<html><body></body></html>");
        assert!(parsed.messages.is_empty());
        assert_eq!(parsed.skipped_blocks, 0);
    }

    #[test]
    fn test_decode_unknown_entity_is_kept() {
        assert_eq!(decode_entities("a &bogus; b &#x41;"), "a &bogus; b A");
    }
}
