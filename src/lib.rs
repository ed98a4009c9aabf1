//! Release audit: cross-references tracker issues with source-control
//! commits to find work that shipped without code, and code that shipped
//! without a ticket.

pub mod adapters;
pub mod audit;
pub mod auth;
pub mod cache;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod model;
pub mod ports;
pub mod summary;

#[cfg(test)]
mod testing;

use clap::Parser;

pub use error::{AuditError, PortError};

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
