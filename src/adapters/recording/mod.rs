//! Adapters that delegate to a live port and record each call.

pub mod issues;
pub mod llm;
pub mod scm;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;

pub use issues::RecordingIssueSource;
pub use llm::RecordingLlmClient;
pub use scm::RecordingCommitSource;

/// Records a port outcome; encoding failures are logged and skipped so a
/// recording run never fails because of the cassette.
pub(crate) fn record_result<T, E>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &Value,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
{
    let Ok(mut guard) = recorder.lock() else {
        warn!(port, method, "cassette recorder lock poisoned; interaction not recorded");
        return;
    };
    if let Err(e) = guard.record_result(port, method, input, result) {
        warn!(port, method, error = %e, "interaction not recorded");
    }
}
