//! `release-audit audit` command.

use std::sync::Arc;

use tracing::info;

use crate::audit::{AuditPipeline, AuditRequest};
use crate::cache::ResultCache;
use crate::cli::AuditArgs;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::export::export;
use crate::model::{AuditResult, RepoBranch};
use crate::summary::Summarizer;

/// Execute the `audit` command.
///
/// Resolves the query and repository/branch pairs from flags or config,
/// runs the pipeline, writes the result, and prints a coverage line. Replay
/// runs skip both settings validation and the result cache.
///
/// # Errors
///
/// Returns an error string if inputs are missing, settings are incomplete,
/// the pipeline fails, or the result cannot be written.
pub async fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    args: &AuditArgs,
) -> Result<(), String> {
    let request = build_request(settings, args)?;
    if !ctx.is_replaying() {
        settings.validate_for_audit().map_err(|e| e.to_string())?;
    }

    let cache = (!ctx.is_replaying())
        .then(|| ResultCache::new(&settings.cache_dir, Arc::clone(&ctx.clock)));
    let pipeline =
        AuditPipeline::new(Arc::clone(&ctx.issues), Arc::clone(&ctx.commits), cache, settings)
            .map_err(|e| e.to_string())?;
    let result = pipeline.run_audit(&request).await.map_err(|e| e.to_string())?;

    export(&result, args.format, &args.out).map_err(|e| e.to_string())?;
    info!(out = %args.out.display(), "audit written");
    println!("{}", coverage_line(&result));
    println!("Results written to {}", args.out.display());

    if args.summarize {
        let summary = Summarizer::new(ctx.llm.as_ref(), &settings.openai_model)
            .summarize_missing(&result.matching.missing)
            .await
            .map_err(|e| e.to_string())?;
        println!();
        println!("{summary}");
    }
    Ok(())
}

/// Builds the pipeline request; flags override config defaults.
///
/// # Errors
///
/// Returns an error string if no query or no repository/branch pair results.
pub fn build_request(settings: &Settings, args: &AuditArgs) -> Result<AuditRequest, String> {
    let query = args.jql.clone().unwrap_or_else(|| settings.jira.jql_default.clone());
    if query.trim().is_empty() {
        return Err("no JQL query: pass --jql or set jira.jql_default in config.yaml".to_string());
    }

    let repos = args.repos.as_deref().map_or_else(|| settings.bitbucket.repos.clone(), split_list);
    let branches = args
        .branches
        .as_deref()
        .map_or_else(|| settings.bitbucket.branch_defaults.clone(), split_list);
    let targets = RepoBranch::product(&settings.bitbucket.project_key, &repos, &branches);
    if targets.is_empty() {
        return Err(
            "no repositories or branches to audit: pass --repos/--branches or set bitbucket.repos"
                .to_string(),
        );
    }

    Ok(AuditRequest {
        query,
        targets,
        start: args.start_date.clone(),
        end: args.end_date.clone(),
        force_refresh: args.update_cache,
    })
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
}

fn coverage_line(result: &AuditResult) -> String {
    format!(
        "Coverage: {:.1}% ({} issues, {} missing commits, {} unlinked commits) over {} .. {}",
        result.matching.coverage,
        result.issues.len(),
        result.matching.missing.len(),
        result.matching.unlinked.len(),
        result.window.start_text(),
        result.window.end_text(),
    )
}
