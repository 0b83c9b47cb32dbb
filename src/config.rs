use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PeekError;
use crate::types::{DEFAULT_MAX_COLS, DEFAULT_MAX_ROWS, PreviewOptions};

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "csvpeek.toml";
/// Overrides `storage_root` from the file.
pub const ROOT_ENV: &str = "CSVPEEK_ROOT";

/// Runtime knobs. Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub default_max_rows: i64,
    pub default_max_cols: i64,
    /// Upper bound on rows an ingest request may ask for.
    pub ingest_max_rows: i64,
    /// Upper bound on columns an ingest request may ask for.
    pub ingest_max_cols: i64,
    pub storage_root: PathBuf,
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_max_rows: DEFAULT_MAX_ROWS,
            default_max_cols: DEFAULT_MAX_COLS,
            ingest_max_rows: 200,
            ingest_max_cols: 40,
            storage_root: PathBuf::from("."),
            cache_ttl_secs: 300,
        }
    }
}

impl Config {
    /// Explicit path must exist. Without one, `csvpeek.toml` is used if present,
    /// otherwise defaults. `CSVPEEK_ROOT` wins over the file either way.
    pub fn load(path: Option<&Path>) -> Result<Self, PeekError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let implicit = Path::new(CONFIG_FILE);
                if implicit.is_file() {
                    Self::from_file(implicit)?
                } else {
                    Self::default()
                }
            }
        };
        if let Ok(root) = std::env::var(ROOT_ENV)
            && !root.is_empty()
        {
            config.storage_root = PathBuf::from(root);
        }
        config.validate(path.unwrap_or(Path::new(CONFIG_FILE)))?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PeekError> {
        let raw = fs::read_to_string(path).map_err(|e| PeekError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&raw, path)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text. `origin` is only used in error messages.
    pub fn parse(raw: &str, origin: &Path) -> Result<Self, PeekError> {
        let config: Self = toml::from_str(raw).map_err(|e| PeekError::Config {
            path: origin.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Path) -> Result<(), PeekError> {
        if self.ingest_max_rows < 1 || self.ingest_max_cols < 1 {
            return Err(PeekError::Config {
                path: origin.to_path_buf(),
                reason: "ingest_max_rows and ingest_max_cols must be at least 1".into(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn default_options(&self) -> PreviewOptions {
        PreviewOptions::new(self.default_max_rows, self.default_max_cols)
    }

    /// Requested limits → effective limits: fall back to defaults, floor at 1,
    /// cap at the ingest maximums.
    #[must_use]
    pub fn ingest_options(&self, max_rows: Option<i64>, max_cols: Option<i64>) -> PreviewOptions {
        let rows = max_rows.unwrap_or(self.default_max_rows).max(1);
        let cols = max_cols.unwrap_or(self.default_max_cols).max(1);
        PreviewOptions::new(rows.min(self.ingest_max_rows), cols.min(self.ingest_max_cols))
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
