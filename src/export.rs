//! Writing audit results to disk.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::AuditError;
use crate::model::AuditResult;

/// Output format of an exported audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// The full result as pretty-printed JSON.
    Json,
    /// One `missing_keys` column listing unlinked issues.
    Csv,
}

/// Writes `result` to `path` in `format`.
///
/// # Errors
///
/// Returns [`AuditError::Export`] if encoding or writing fails.
pub fn export(result: &AuditResult, format: ExportFormat, path: &Path) -> Result<(), AuditError> {
    let content = match format {
        ExportFormat::Json => to_json(result)?,
        ExportFormat::Csv => to_csv(result),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AuditError::Export(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| AuditError::Export(format!("failed to write {}: {e}", path.display())))
}

/// Pretty-printed JSON of the whole result.
///
/// # Errors
///
/// Returns [`AuditError::Export`] if serialization fails.
pub fn to_json(result: &AuditResult) -> Result<String, AuditError> {
    let mut json =
        serde_json::to_string_pretty(result).map_err(|e| AuditError::Export(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

/// CSV with a `missing_keys` header and one missing issue key per row.
#[must_use]
pub fn to_csv(result: &AuditResult) -> String {
    let mut csv = String::from("missing_keys\n");
    for key in &result.matching.missing {
        let _ = writeln!(csv, "{}", csv_field(key));
    }
    csv
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
