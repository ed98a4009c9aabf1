//! `release-audit summarize` command.

use std::path::Path;

use crate::cli::SummaryKind;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::AuditError;
use crate::model::AuditResult;
use crate::summary::Summarizer;

/// Execute the `summarize` command on a saved audit result.
///
/// # Errors
///
/// Returns an error string if the result file cannot be read or the model
/// call fails.
pub async fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    path: &Path,
    kind: SummaryKind,
) -> Result<(), String> {
    let result = load_result(path).map_err(|e| e.to_string())?;
    let summarizer = Summarizer::new(ctx.llm.as_ref(), &settings.openai_model);

    let text = match kind {
        SummaryKind::Missing => summarizer.summarize_missing(&result.matching.missing).await,
        SummaryKind::Regression => summarizer.suggest_regression_areas(&result.commits).await,
        SummaryKind::Notes => summarizer.release_notes(&result.issues).await,
    }
    .map_err(|e| e.to_string())?;

    println!("{text}");
    Ok(())
}

/// Reads an audit result written by the JSON exporter.
///
/// # Errors
///
/// Returns [`AuditError::InvalidInput`] if the file is unreadable or not an
/// audit result.
pub fn load_result(path: &Path) -> Result<AuditResult, AuditError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AuditError::InvalidInput(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| {
        AuditError::InvalidInput(format!("{} is not an audit result: {e}", path.display()))
    })
}
