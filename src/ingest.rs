use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::PeekError;
use crate::format::format_preview_text;
use crate::media;
use crate::preview::parse_csv_preview;
use crate::storage::{FileStorage, storage_key_from_url};
use crate::types::{Attachment, CsvPreview, PreviewOptions, PreviewPart};

const UNSUPPORTED_REASON: &str = "Unsupported file type for ingest";
const UNSUPPORTED_SOLUTION: &str =
    "Currently supported: CSV. Convert your spreadsheet to CSV or paste sample rows.";

/// Limits used for attachment previews, independent of config.
pub const ATTACHMENT_OPTIONS: PreviewOptions = PreviewOptions {
    max_rows: 50,
    max_cols: 12,
};

/// Is this attachment something we can preview? Media type first, then the
/// file name (or key), then a content-type hint in the URL.
#[must_use]
pub fn is_csv_like(attachment: &Attachment, key: &str) -> bool {
    if attachment
        .media_type
        .as_deref()
        .is_some_and(media::is_ingest_supported)
    {
        return true;
    }
    let name = attachment
        .filename
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(key);
    media::is_csv_name(name) || media::url_declares_csv(&attachment.url)
}

/// Preview every CSV-like `source-url` attachment. Anything else, and any
/// attachment whose download fails, is skipped. Downloads run in parallel;
/// output keeps input order.
pub fn build_preview_parts(
    attachments: &[Attachment],
    storage: &dyn FileStorage,
) -> Vec<PreviewPart> {
    attachments
        .par_iter()
        .filter_map(|attachment| preview_attachment(attachment, storage))
        .collect()
}

fn preview_attachment(attachment: &Attachment, storage: &dyn FileStorage) -> Option<PreviewPart> {
    if !attachment.is_source_url() {
        return None;
    }
    let key = storage_key_from_url(&attachment.url)?;
    if !is_csv_like(attachment, &key) {
        let mime = attachment.media_type.as_deref();
        if media::is_file_part_supported(mime, None) {
            tracing::debug!(key = %key, mime, "attachment goes to the model as a file part");
        } else {
            tracing::debug!(key = %key, "attachment is not csv-like, skipping");
        }
        return None;
    }

    let bytes = match storage.download(&key) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "attachment download failed, skipping preview");
            return None;
        }
    };
    let preview = parse_csv_preview(&bytes, ATTACHMENT_OPTIONS);
    let name = attachment
        .filename
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(key.as_str());
    Some(PreviewPart::text(format_preview_text(name, &preview)))
}

/// What the caller says to ingest. `key` wins over `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// `"csv"` forces CSV; anything else (or nothing) infers from the key/URL.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub max_rows: Option<i64>,
    #[serde(default)]
    pub max_cols: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub key: String,
    pub preview: CsvPreview,
    pub text: String,
}

impl IngestRequest {
    /// Storage key from `key`, or derived from `url`.
    #[must_use]
    pub fn resolve_key(&self) -> Option<String> {
        match (self.key.as_deref(), self.url.as_deref()) {
            (Some(k), _) if !k.is_empty() => Some(k.to_string()),
            (_, Some(u)) if !u.is_empty() => storage_key_from_url(u),
            _ => None,
        }
    }

    fn is_csv(&self, key: &str) -> bool {
        self.kind.as_deref() == Some("csv")
            || media::is_csv_name(key)
            || self.url.as_deref().is_some_and(media::url_declares_csv)
    }

    /// Resolved key of a request that names a CSV. Nothing is downloaded.
    pub fn checked_key(&self) -> Result<String, PeekError> {
        let key = self
            .resolve_key()
            .ok_or_else(|| PeekError::invalid("Missing 'key' or 'url'"))?;

        if !self.is_csv(&key) {
            return Err(PeekError::Unsupported {
                key,
                reason: UNSUPPORTED_REASON.into(),
                solution: UNSUPPORTED_SOLUTION.into(),
            });
        }
        Ok(key)
    }
}

/// Download and parse an already checked key.
pub(crate) fn load_preview(
    key: &str,
    storage: &dyn FileStorage,
    options: PreviewOptions,
) -> Result<CsvPreview, PeekError> {
    let bytes = storage.download(key)?;
    let preview = parse_csv_preview(&bytes, options);
    tracing::info!(
        key,
        total_rows = preview.total_rows,
        columns = preview.columns,
        "ingested csv preview"
    );
    Ok(preview)
}

/// Resolve, type-check, download and preview one object.
/// Download errors propagate; this is the explicit-request path, not the
/// best-effort attachment path.
pub fn handle_ingest(
    request: &IngestRequest,
    storage: &dyn FileStorage,
    config: &Config,
) -> Result<IngestResponse, PeekError> {
    let key = request.checked_key()?;
    let options = config.ingest_options(request.max_rows, request.max_cols);
    let preview = load_preview(&key, storage, options)?;
    let text = format_preview_text(&key, &preview);

    Ok(IngestResponse {
        ok: true,
        kind: "csv",
        key,
        preview,
        text,
    })
}

/// Same as [`handle_ingest`], from a raw JSON body.
pub fn handle_ingest_json(
    body: &str,
    storage: &dyn FileStorage,
    config: &Config,
) -> Result<IngestResponse, PeekError> {
    let request: IngestRequest =
        serde_json::from_str(body).map_err(|_| PeekError::invalid("Invalid JSON"))?;
    handle_ingest(&request, storage, config)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::{Blob, MemoryFileStorage};

    /// Storage that counts calls and can be told to fail.
    struct Probe {
        inner: MemoryFileStorage,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Probe {
        fn new(fail: bool) -> Self {
            let inner = MemoryFileStorage::new();
            inner.insert("uploads/data.csv", "col1,col2\n1,2\n3,4\n");
            Self {
                inner,
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl FileStorage for Probe {
        fn download(&self, key: &str) -> Result<Blob, PeekError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PeekError::Io {
                    key: key.into(),
                    source: std::io::Error::other("network"),
                });
            }
            self.inner.download(key)
        }
    }

    fn csv_attachment() -> Attachment {
        Attachment::source_url("https://example.com/uploads/data.csv")
            .with_media_type("text/csv")
            .with_filename("data.csv")
    }

    #[test]
    fn previews_csv_attachments() {
        let storage = Probe::new(false);
        let parts = build_preview_parts(&[csv_attachment()], &storage);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].kind, "text");
        assert!(parts[0].ingestion_preview);
        assert!(parts[0].text.contains("rows: 3"));
        assert!(parts[0].text.contains("| col1 | col2 |"));
        assert!(parts[0].text.contains("preview of data.csv"));
    }

    #[test]
    fn skips_non_csv_attachments() {
        let storage = Probe::new(false);
        let json = Attachment::source_url("https://example.com/uploads/data.json")
            .with_media_type("application/json")
            .with_filename("data.json");
        assert!(build_preview_parts(&[json], &storage).is_empty());
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn skips_invalid_urls_and_other_kinds() {
        let storage = Probe::new(false);
        let bad_url = Attachment {
            url: "not-a-url".into(),
            ..csv_attachment()
        };
        let file_kind = Attachment {
            kind: "file".into(),
            ..csv_attachment()
        };
        assert!(build_preview_parts(&[bad_url, file_kind], &storage).is_empty());
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn continues_when_download_fails() {
        let storage = Probe::new(true);
        assert!(build_preview_parts(&[csv_attachment()], &storage).is_empty());
        assert_eq!(storage.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn falls_back_to_key_for_name_and_detection() {
        let storage = Probe::new(false);
        let bare = Attachment::source_url("https://example.com/uploads/data.csv");
        let parts = build_preview_parts(&[bare], &storage);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].text.contains("preview of uploads/data.csv"));
    }

    #[test]
    fn content_type_hint_in_url() {
        let a = Attachment::source_url("https://x.test/blob/abc?contentType=text/csv");
        assert!(is_csv_like(&a, "blob/abc"));
        let b = Attachment::source_url("https://x.test/blob/abc");
        assert!(!is_csv_like(&b, "blob/abc"));
    }

    #[test]
    fn output_keeps_input_order() {
        let storage = MemoryFileStorage::new();
        let mut attachments = Vec::new();
        for i in 0..16 {
            storage.insert(format!("f{i}.csv"), format!("n\n{i}\n"));
            attachments.push(Attachment::source_url(format!("https://x.test/f{i}.csv")));
        }
        let parts = build_preview_parts(&attachments, &storage);
        assert_eq!(parts.len(), 16);
        for (i, part) in parts.iter().enumerate() {
            assert!(part.text.contains(&format!("f{i}.csv")));
        }
    }

    #[test]
    fn ingest_by_key() {
        let storage = Probe::new(false);
        let req = IngestRequest {
            key: Some("uploads/data.csv".into()),
            ..IngestRequest::default()
        };
        let res = handle_ingest(&req, &storage, &Config::default()).unwrap();
        assert!(res.ok);
        assert_eq!(res.kind, "csv");
        assert_eq!(res.key, "uploads/data.csv");
        assert_eq!(res.preview.total_rows, 3);
        assert!(res.text.starts_with("Here is a preview of uploads/data.csv"));
    }

    #[test]
    fn ingest_by_url_with_limits() {
        let storage = Probe::new(false);
        let body = r#"{"url":"https://example.com/uploads/data.csv","maxRows":1,"maxCols":0}"#;
        let res = handle_ingest_json(body, &storage, &Config::default()).unwrap();
        assert_eq!(res.preview.rows.len(), 1);
        assert_eq!(res.preview.columns, 1);
    }

    #[test]
    fn ingest_errors() {
        let storage = Probe::new(false);
        let config = Config::default();

        let err = handle_ingest_json("{not json", &storage, &config).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON");

        let err = handle_ingest_json("{}", &storage, &config).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'key' or 'url'");

        let err = handle_ingest_json(r#"{"key":"report.xlsx"}"#, &storage, &config).unwrap_err();
        assert!(matches!(err, PeekError::Unsupported { .. }));
        assert!(err.solution().unwrap().contains("Currently supported: CSV"));
        assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn checked_key_needs_csv_evidence() {
        let forced = IngestRequest {
            key: Some("exports/data".into()),
            kind: Some("csv".into()),
            ..IngestRequest::default()
        };
        assert_eq!(forced.checked_key().unwrap(), "exports/data");

        let auto = IngestRequest {
            kind: None,
            ..forced
        };
        assert!(matches!(
            auto.checked_key(),
            Err(PeekError::Unsupported { .. })
        ));
    }

    #[test]
    fn explicit_csv_type_overrides_extension() {
        let storage = MemoryFileStorage::new();
        storage.insert("exports/123", "a,b\n1,2\n");
        let body = r#"{"key":"exports/123","type":"csv"}"#;
        let res = handle_ingest_json(body, &storage, &Config::default()).unwrap();
        assert_eq!(res.preview.header, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn ingest_download_errors_propagate() {
        let storage = Probe::new(true);
        let req = IngestRequest {
            key: Some("uploads/data.csv".into()),
            ..IngestRequest::default()
        };
        let err = handle_ingest(&req, &storage, &Config::default()).unwrap_err();
        assert!(matches!(err, PeekError::Io { .. }));
    }

    #[test]
    fn response_wire_shape() {
        let storage = Probe::new(false);
        let res =
            handle_ingest_json(r#"{"key":"uploads/data.csv"}"#, &storage, &Config::default())
                .unwrap();
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["type"], "csv");
        assert_eq!(json["preview"]["columns"], 2);
        assert_eq!(json["preview"]["totalRows"], 3);
    }
}
