use std::path::PathBuf;

/// Every error csvpeek can produce. Displayed as user-facing messages with suggestions.
///
/// The parser itself never fails; these come from storage, request decoding
/// and configuration.
#[derive(Debug, thiserror::Error)]
pub enum PeekError {
    #[error("not found: {key}{}", suggestion_suffix(.suggestion.as_ref()))]
    NotFound {
        key: String,
        suggestion: Option<String>,
    },

    #[error("{key} [permission denied]")]
    PermissionDenied { key: String },

    #[error("{reason}")]
    InvalidRequest { reason: String },

    #[error("{reason}: {key}")]
    Unsupported {
        key: String,
        reason: String,
        solution: String,
    },

    #[error("{key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config error in {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

fn suggestion_suffix(suggestion: Option<&String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean: {s})"),
        None => String::new(),
    }
}

impl PeekError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Process exit code for the CLI.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::Io { .. } => 2,
            Self::InvalidRequest { .. } | Self::Unsupported { .. } | Self::Config { .. } => 3,
            Self::PermissionDenied { .. } => 4,
        }
    }

    /// Remediation hint, when the error carries one.
    #[must_use]
    pub fn solution(&self) -> Option<&str> {
        match self {
            Self::Unsupported { solution, .. } => Some(solution),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_shows_suggestion() {
        let err = PeekError::NotFound {
            key: "uploads/sales.cvs".into(),
            suggestion: Some("sales.csv".into()),
        };
        assert_eq!(
            err.to_string(),
            "not found: uploads/sales.cvs (did you mean: sales.csv)"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unsupported_carries_solution() {
        let err = PeekError::Unsupported {
            key: "report.xlsx".into(),
            reason: "Unsupported file type for ingest".into(),
            solution: "convert it".into(),
        };
        assert_eq!(err.solution(), Some("convert it"));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("report.xlsx"));
    }
}
