//! CSV report encoding
//!
//! Writes a [`ScoreMatrix`] as a spreadsheet-friendly CSV: a header of
//! `Name,Image URL,<date>...` followed by one row per conversation.

use crate::error::PulseError;
use crate::types::ScoreMatrix;
use std::borrow::Cow;
use std::io::Write;

/// Placeholder image service; initials are appended as the `text` parameter
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://dummyimage.com/300x200/000/fff.png&text=";

/// CSV encoder for score matrices
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    image_base_url: String,
}

impl Default for CsvReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReportWriter {
    pub fn new() -> Self {
        Self {
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
        }
    }

    /// Use a different placeholder image service
    pub fn with_image_base_url(image_base_url: impl Into<String>) -> Self {
        Self {
            image_base_url: image_base_url.into(),
        }
    }

    /// Placeholder image URL for a display name
    pub fn image_url(&self, name: &str) -> String {
        format!("{}{}", self.image_base_url, initials(name))
    }

    /// Write the header and all rows to `out`
    pub fn write<W: Write>(&self, matrix: &ScoreMatrix, mut out: W) -> Result<(), PulseError> {
        let mut header: Vec<Cow<'_, str>> = vec![Cow::Borrowed("Name"), Cow::Borrowed("Image URL")];
        header.extend(matrix.labels.iter().map(|l| csv_escape(l)));
        writeln!(out, "{}", header.join(","))?;

        for row in &matrix.rows {
            let mut fields: Vec<Cow<'_, str>> = Vec::with_capacity(row.values.len() + 2);
            fields.push(csv_escape(&row.name));
            fields.push(Cow::Owned(csv_escape(&self.image_url(&row.name)).into_owned()));
            fields.extend(row.values.iter().map(|&v| Cow::Owned(format_value(v))));
            writeln!(out, "{}", fields.join(","))?;
        }

        out.flush()?;
        Ok(())
    }

    /// Encode to an in-memory string
    pub fn to_csv_string(&self, matrix: &ScoreMatrix) -> Result<String, PulseError> {
        let mut buffer = Vec::new();
        self.write(matrix, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// First letter of the first and last name parts, uppercased.
/// Single-word names repeat their initial; an empty name has none.
pub fn initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
        return String::new();
    };

    [first, last]
        .iter()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Quote a field if it contains a delimiter, quote or line break
fn csv_escape(s: &str) -> Cow<'_, str> {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return Cow::Borrowed(s);
    }
    Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
}

/// Whole numbers keep one decimal place so every cell reads as a real
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
