use std::fs;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use dashmap::DashMap;
use memmap2::Mmap;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::PeekError;

/// Downloaded object bytes. Local files stay memory-mapped; everything else owns a buffer.
pub enum Blob {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => &m[..],
            Self::Owned(v) => &v[..],
        }
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Mapped(_) => "mapped",
            Self::Owned(_) => "owned",
        };
        f.debug_struct("Blob")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(v: Vec<u8>) -> Self {
        Self::Owned(v)
    }
}

/// Where attachment bytes come from. The parser never does I/O itself;
/// whoever calls it brings one of these.
pub trait FileStorage: Send + Sync {
    fn download(&self, key: &str) -> Result<Blob, PeekError>;

    /// Change marker for caching. `None` means "don't cache".
    fn modified(&self, _key: &str) -> Option<SystemTime> {
        None
    }
}

/// Turn an upload URL into a storage key: the path without its leading
/// slash, percent-decoded. Query and fragment are dropped.
/// `None` for anything that isn't an absolute URL with a path.
#[must_use]
pub fn storage_key_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    let key = percent_decode_str(path).decode_utf8().ok()?;
    Some(key.into_owned())
}

/// Keys resolved under a root directory on local disk.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Keys are relative and may not climb out of the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, PeekError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(PeekError::invalid(format!("invalid storage key: {key:?}")));
        }
        Ok(self.root.join(rel))
    }
}

impl FileStorage for LocalFileStorage {
    fn download(&self, key: &str) -> Result<Blob, PeekError> {
        let path = self.resolve(key)?;
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PeekError::NotFound {
                    key: key.to_string(),
                    suggestion: suggest_similar(&path),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(PeekError::PermissionDenied {
                    key: key.to_string(),
                });
            }
            Err(e) => {
                return Err(PeekError::Io {
                    key: key.to_string(),
                    source: e,
                });
            }
        };

        if meta.is_dir() {
            return Err(PeekError::invalid(format!("{key} is a directory")));
        }

        // mmap on 0-byte file may fail on some platforms
        if meta.len() == 0 {
            tracing::debug!(key, "empty object");
            return Ok(Blob::Owned(Vec::new()));
        }

        let file = fs::File::open(&path).map_err(|e| PeekError::Io {
            key: key.to_string(),
            source: e,
        })?;
        // SAFETY: read-only mapping; uploads are written once and not truncated in place.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| PeekError::Io {
            key: key.to_string(),
            source: e,
        })?;
        tracing::debug!(key, bytes = meta.len(), "mapped object");
        Ok(Blob::Mapped(mmap))
    }

    fn modified(&self, key: &str) -> Option<SystemTime> {
        let path = self.resolve(key).ok()?;
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

/// In-process object store. Handy for tests and for callers that already hold the bytes.
#[derive(Default)]
pub struct MemoryFileStorage {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryFileStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.insert(key.into(), bytes.into());
    }
}

impl FileStorage for MemoryFileStorage {
    fn download(&self, key: &str) -> Result<Blob, PeekError> {
        self.objects
            .get(key)
            .map(|v| Blob::Owned(v.clone()))
            .ok_or_else(|| PeekError::NotFound {
                key: key.to_string(),
                suggestion: None,
            })
    }
}

/// Suggest a similar file name from the parent directory (edit distance).
fn suggest_similar(path: &Path) -> Option<String> {
    let parent = path.parent()?;
    let name = path.file_name()?.to_str()?;
    let entries = fs::read_dir(parent).ok()?;

    let mut best: Option<(usize, String)> = None;
    for entry in entries.flatten() {
        let candidate = entry.file_name();
        let candidate = candidate.to_string_lossy();
        let dist = edit_distance(name, &candidate);
        if dist <= 3 {
            match &best {
                Some((d, _)) if dist < *d => best = Some((dist, candidate.into_owned())),
                None => best = Some((dist, candidate.into_owned())),
                _ => {}
            }
        }
    }
    best.map(|(_, name)| name)
}

/// Simple Levenshtein distance, only used on short file names.
fn edit_distance(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
