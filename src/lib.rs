#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,  // token math on u64 → usize, we target 64-bit
    clippy::module_name_repetitions,   // Rust naming conventions
    clippy::missing_errors_doc,        // internal pub(crate) fns don't need error docs
    clippy::missing_panics_doc,        // same
)]

pub(crate) mod budget;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod mcp;
pub mod media;
pub mod preview;
pub(crate) mod session;
pub mod storage;
pub mod types;

use std::io::Read;
use std::path::Path;

use storage::FileStorage;

pub use error::PeekError;
pub use format::format_preview_text;
pub use preview::parse_csv_preview;
pub use types::{CsvPreview, PreviewOptions};

/// The one-shot CLI path: read a file (or stdin for `-`), preview it,
/// format it under `name` (defaults to the path), optionally fit a token budget.
pub fn preview_path(
    path: &Path,
    name: Option<&str>,
    options: PreviewOptions,
    budget_tokens: Option<u64>,
) -> Result<(CsvPreview, String), PeekError> {
    let bytes = read_source(path)?;
    let preview = parse_csv_preview(&bytes, options);
    let display = path.display().to_string();
    let text = format_preview_text(name.unwrap_or(display.as_str()), &preview);
    let text = match budget_tokens {
        Some(b) => budget::apply(&text, b),
        None => text,
    };
    Ok((preview, text))
}

fn read_source(path: &Path) -> Result<storage::Blob, PeekError> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| PeekError::Io {
                key: "<stdin>".into(),
                source: e,
            })?;
        return Ok(buf.into());
    }

    let (root, key) = match (path.parent(), path.file_name().and_then(|n| n.to_str())) {
        (Some(parent), Some(name)) => (parent, name),
        _ => {
            return Err(PeekError::invalid(format!(
                "not a file path: {}",
                path.display()
            )));
        }
    };
    let root = if root.as_os_str().is_empty() {
        Path::new(".")
    } else {
        root
    };
    storage::LocalFileStorage::new(root).download(key)
}
