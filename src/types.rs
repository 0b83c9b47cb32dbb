use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_MAX_ROWS: i64 = 50;
pub(crate) const DEFAULT_MAX_COLS: i64 = 12;

/// Row/column limits for a preview. Non-positive values clamp to 1; callers
/// never get an error for a silly limit, just a one-cell peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewOptions {
    pub max_rows: i64,
    pub max_cols: i64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_cols: DEFAULT_MAX_COLS,
        }
    }
}

impl PreviewOptions {
    #[must_use]
    pub fn new(max_rows: i64, max_cols: i64) -> Self {
        Self { max_rows, max_cols }
    }

    /// Limits as usable slice lengths, clamped to at least 1.
    #[must_use]
    pub fn clamped(self) -> (usize, usize) {
        (clamp_limit(self.max_rows), clamp_limit(self.max_cols))
    }
}

fn clamp_limit(n: i64) -> usize {
    usize::try_from(n.max(1)).unwrap_or(usize::MAX)
}

/// Bounded view of a delimited text file. Built once per parse, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvPreview {
    /// First parsed row, cut to `max_cols`.
    pub header: Vec<String>,
    /// Data rows after the header, cut to `max_rows` × `max_cols`. Ragged.
    pub rows: Vec<Vec<String>>,
    /// Always `header.len()`.
    pub columns: usize,
    /// Every parsed row including the header, before truncation.
    pub total_rows: usize,
    pub markdown_table: String,
}

/// A chat attachment as it arrives from the upload layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Attachment {
    pub const SOURCE_URL: &'static str = "source-url";

    #[must_use]
    pub fn source_url(url: impl Into<String>) -> Self {
        Self {
            kind: Self::SOURCE_URL.to_string(),
            url: url.into(),
            media_type: None,
            filename: None,
        }
    }

    #[must_use]
    pub fn with_media_type(mut self, mime: impl Into<String>) -> Self {
        self.media_type = Some(mime.into());
        self
    }

    #[must_use]
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    #[must_use]
    pub fn is_source_url(&self) -> bool {
        self.kind == Self::SOURCE_URL
    }
}

/// A text message part carrying a CSV preview, ready to splice into a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPart {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
    pub ingestion_preview: bool,
}

impl PreviewPart {
    #[must_use]
    pub fn text(text: String) -> Self {
        Self {
            kind: "text",
            text,
            ingestion_preview: true,
        }
    }
}

/// Tokens ≈ bytes / 4. Ceiling division, no float.
#[must_use]
pub fn estimate_tokens(byte_len: u64) -> u64 {
    byte_len.div_ceil(4)
}
