//! YAML cassettes of port interactions for offline record and replay.
//!
//! A recording run wraps the live adapters and writes every call with its
//! input and outcome to a cassette; a replay run serves the same calls from
//! the file with no network access. Outcomes are stored as `{"Ok": value}`
//! or `{"Err": message}`.

pub mod format;
pub mod recorder;
pub mod replayer;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PortError;

pub use format::{Cassette, Interaction};
pub use recorder::CassetteRecorder;
pub use replayer::{CassetteReplayer, ReplayError};

/// Encodes a port outcome in the cassette convention.
///
/// # Errors
///
/// Returns an error if the `Ok` value cannot be represented as JSON.
pub fn encode_result<T, E>(result: &Result<T, E>) -> Result<Value, serde_json::Error>
where
    T: Serialize,
    E: std::fmt::Display,
{
    Ok(match result {
        Ok(value) => serde_json::json!({ "Ok": serde_json::to_value(value)? }),
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    })
}

/// Decodes an outcome written by [`encode_result`].
///
/// # Errors
///
/// Returns the recorded error message, or a decode error if `output` is in
/// neither form or the `Ok` value has the wrong shape.
pub fn decode_result<T: DeserializeOwned>(output: Value) -> Result<T, PortError> {
    match output {
        Value::Object(mut map) => {
            if let Some(value) = map.remove("Ok") {
                return serde_json::from_value(value)
                    .map_err(|e| format!("recorded value does not decode: {e}").into());
            }
            match map.remove("Err") {
                Some(Value::String(message)) => Err(message.into()),
                Some(other) => Err(other.to_string().into()),
                None => Err("recorded outcome has neither Ok nor Err".into()),
            }
        }
        other => Err(format!("recorded outcome is not an object: {other}").into()),
    }
}
