//! Accumulates interactions and writes them as a YAML cassette.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use super::encode_result;
use super::format::{Cassette, Interaction};
use crate::cache::write_atomic;

/// Collects interactions from the recording adapters.
///
/// Shared between adapters behind a mutex; calls from concurrent workers are
/// appended in completion order.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Creates a recorder that will write to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), interactions: Vec::new() }
    }

    /// Destination of the cassette.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Returns `true` before the first interaction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Appends an interaction with the next sequence number.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = u64::try_from(self.interactions.len()).unwrap_or(u64::MAX);
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Appends a port outcome in the `Ok`/`Err` convention.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` or the `Ok` value cannot be encoded as JSON;
    /// nothing is recorded then.
    pub fn record_result<I, T, E>(
        &mut self,
        port: &str,
        method: &str,
        input: &I,
        result: &Result<T, E>,
    ) -> Result<(), serde_json::Error>
    where
        I: Serialize,
        T: Serialize,
        E: std::fmt::Display,
    {
        let input = serde_json::to_value(input)?;
        let output = encode_result(result)?;
        self.record(port, method, input, output);
        Ok(())
    }

    /// Writes everything recorded so far to the cassette path.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be encoded or written.
    pub fn write(&self) -> std::io::Result<&Path> {
        let cassette = Cassette {
            name: self.name.clone(),
            recorded_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            interactions: self.interactions.clone(),
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        write_atomic(&self.path, yaml.as_bytes())?;
        Ok(&self.path)
    }
}
