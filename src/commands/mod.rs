//! Command dispatch and handlers.

pub mod audit;
pub mod summarize;

use std::env;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::context::ServiceContext;

/// Environment variable naming a cassette file to record port calls into.
pub const RECORD_ENV: &str = "AUDIT_RECORD";

/// Dispatch a parsed command to its handler.
///
/// `--replay <cassette>` answers every port call from the cassette. When
/// `AUDIT_RECORD` names a file, live calls are recorded to it.
///
/// # Errors
///
/// Returns an error string if configuration fails or the handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let settings = Settings::load().map_err(|e| e.to_string())?;
    let record = env::var_os(RECORD_ENV).filter(|path| !path.is_empty()).map(PathBuf::from);
    let ctx = build_context(cli.replay.as_deref(), record.as_deref(), &settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    let result = runtime.block_on(dispatch_with_context(&cli.command, &ctx, &settings));

    // Dropping the context writes any cassette, also when the command failed.
    drop(ctx);
    result
}

fn build_context(
    replay: Option<&Path>,
    record: Option<&Path>,
    settings: &Settings,
) -> Result<ServiceContext, String> {
    let ctx = match (replay, record) {
        (Some(cassette), _) => ServiceContext::replaying(cassette),
        (None, Some(cassette)) => ServiceContext::recording(settings, cassette),
        (None, None) => ServiceContext::live(settings),
    };
    ctx.map_err(|e| e.to_string())
}

/// Dispatch a command with the given service context.
async fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    settings: &Settings,
) -> Result<(), String> {
    match command {
        Command::Audit(args) => audit::run(ctx, settings, args).await,
        Command::Summarize { result, kind } => summarize::run(ctx, settings, result, *kind).await,
    }
}
