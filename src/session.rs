use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks MCP activity across calls.
/// Stored alongside `PreviewCache` in server state.
pub struct Session {
    previews: AtomicUsize,
    attachments: AtomicUsize,
    failures: AtomicUsize,
    keys: Mutex<HashMap<String, usize>>, // storage key → preview count
}

impl Session {
    pub fn new() -> Self {
        Session {
            previews: AtomicUsize::new(0),
            attachments: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            keys: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_preview(&self, key: &str) {
        self.previews.fetch_add(1, Ordering::Relaxed);
        let mut keys = self
            .keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *keys.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn record_attachments(&self, count: usize) {
        self.attachments.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> String {
        let previews = self.previews.load(Ordering::Relaxed);
        let attachments = self.attachments.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);

        let mut out =
            format!("Previews: {previews} | Attachments: {attachments} | Failures: {failures}");

        let keys = self
            .keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !keys.is_empty() {
            let mut sorted: Vec<_> = keys.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            let top: Vec<String> = sorted
                .iter()
                .take(5)
                .map(|(key, count)| format!("{key} ({count})"))
                .collect();
            let _ = write!(out, "\nTop files: {}", top.join(", "));
        }

        out
    }

    pub fn reset(&self) {
        self.previews.store(0, Ordering::Relaxed);
        self.attachments.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
