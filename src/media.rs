/// MIME types a model can take directly as a file part.
pub const DEFAULT_FILE_PART_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
];

/// MIME types we can turn into a text preview.
pub const INGEST_MIME_TYPES: &[&str] = &["text/csv", "application/csv"];

/// Can this MIME type be handed to the model as-is? Missing → no.
/// An explicit whitelist replaces the default list entirely; empty supports nothing.
#[must_use]
pub fn is_file_part_supported(mime: Option<&str>, whitelist: Option<&[&str]>) -> bool {
    let Some(mime) = mime else {
        return false;
    };
    let allowed = whitelist.unwrap_or(DEFAULT_FILE_PART_MIME_TYPES);
    allowed.contains(&mime)
}

/// Does this MIME type get a CSV preview? Ignores case and `; charset=...`.
#[must_use]
pub fn is_ingest_supported(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim();
    INGEST_MIME_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(essence))
}

/// Name ends in `.csv`, any case.
#[must_use]
pub fn is_csv_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 4 && bytes[bytes.len() - 4..].eq_ignore_ascii_case(b".csv")
}

/// Upload URLs sometimes carry the type as a query parameter
/// (`?contentType=text/csv` or `content-type=text/csv`).
/// Byte matching, no regex. The parameter must be a whole `name=value` pair,
/// so a fragment glued onto the value (`text/csv#x`) does not count.
#[must_use]
pub fn url_declares_csv(url: &str) -> bool {
    let Some((_, query)) = url.split_once('?') else {
        return false;
    };
    query.split('&').any(|pair| {
        pair.split_once('=').is_some_and(|(name, value)| {
            (name.eq_ignore_ascii_case("contentType") || name.eq_ignore_ascii_case("content-type"))
                && value.eq_ignore_ascii_case("text/csv")
        })
    })
}
