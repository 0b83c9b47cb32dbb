use crate::types::{CsvPreview, PreviewPart};

/// The message an agent sees for one file:
/// `Here is a preview of {name} (rows: N, cols: M). ...` then the table.
#[must_use]
pub fn format_preview_text(name: &str, preview: &CsvPreview) -> String {
    format!(
        "Here is a preview of {name} (rows: {}, cols: {}). Summarize or analyze as needed.\n\n{}",
        preview.total_rows, preview.columns, preview.markdown_table
    )
}

/// Stack preview parts for a text-only channel, blank line between each.
pub fn join_parts(parts: &[PreviewPart]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&part.text);
    }
    out
}
