//! Adapters that answer port calls from a cassette.

pub mod issues;
pub mod llm;
pub mod scm;

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::decode_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::error::PortError;

pub use issues::ReplayingIssueSource;
pub use llm::ReplayingLlmClient;
pub use scm::ReplayingCommitSource;

/// Looks up and decodes the recorded outcome of one call.
pub(crate) fn replay<T: DeserializeOwned>(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
    input: &Value,
) -> Result<T, PortError> {
    let output = replayer
        .lock()
        .map_err(|_| PortError::from("cassette replayer lock poisoned"))?
        .next_output(port, method, input)?;
    decode_result(output)
}
