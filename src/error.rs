//! Error type shared by the audit engine and its adapters.

/// Boxed error used at port boundaries.
///
/// Ports return this rather than [`AuditError`] so that recording and
/// replaying adapters can carry any failure across a cassette as a string.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while configuring or running an audit.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Caller-supplied input cannot be used (empty issue set, bad window, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Retrieving issues or commits failed.
    #[error("fetch failed: {context}: {source}")]
    Fetch {
        /// What was being fetched when the failure happened.
        context: String,
        /// The underlying port or parse failure.
        #[source]
        source: PortError,
    },

    /// A cache record could not be read or decoded. Never surfaced by the
    /// cache itself; it is logged and turned into a miss.
    #[error("cache read failed for {key}: {reason}")]
    CacheRead {
        /// The sanitized cache key.
        key: String,
        /// Why the record was rejected.
        reason: String,
    },

    /// Required settings are missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No usable credential, or refreshing one failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Writing an export file failed.
    #[error("export failed: {0}")]
    Export(String),

    /// The language model could not produce a summary.
    #[error("summary failed: {0}")]
    Summary(String),
}

impl AuditError {
    /// Wraps a port failure as a fetch error with the given context.
    pub fn fetch(context: impl Into<String>, source: impl Into<PortError>) -> Self {
        Self::Fetch { context: context.into(), source: source.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_includes_context_and_source() {
        let err = AuditError::fetch("issues page at offset 50", "HTTP 502");
        assert_eq!(err.to_string(), "fetch failed: issues page at offset 50: HTTP 502");
    }

    #[test]
    fn fetch_error_exposes_source() {
        use std::error::Error;

        let err = AuditError::fetch("commits", "boom");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("boom"));
    }
}
