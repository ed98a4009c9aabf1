//! On-disk cassette layout.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// One call made through a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in recording order.
    pub seq: u64,
    /// Port name: `issues`, `commits`, or `llm`.
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Arguments that identify the call during replay.
    pub input: serde_json::Value,
    /// Encoded outcome.
    pub output: serde_json::Value,
}

/// A recorded session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Session label.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Version of the tool that wrote the cassette.
    #[serde(default)]
    pub tool_version: String,
    /// Calls in recording order.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads a cassette from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the file is unreadable or not
    /// a cassette.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuditError::Configuration(format!("failed to read cassette {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            AuditError::Configuration(format!("failed to parse cassette {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.cassette.yaml");
        let cassette = Cassette {
            name: "audit".into(),
            recorded_at: Utc::now(),
            tool_version: "0.1.0".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: "issues".into(),
                method: "search_page".into(),
                input: json!({"query": "project = ABC", "start_at": 0, "max_results": 50}),
                output: json!({"Ok": {"startAt": 0, "maxResults": 50, "total": 0, "issues": []}}),
            }],
        };
        std::fs::write(&path, serde_yaml::to_string(&cassette).unwrap()).unwrap();

        assert_eq!(Cassette::load(&path).unwrap(), cassette);
    }

    #[test]
    fn tool_version_is_optional() {
        let yaml = "name: x\nrecorded_at: 2024-06-01T00:00:00Z\ninteractions: []\n";
        let cassette: Cassette = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cassette.tool_version, "");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = Cassette::load(Path::new("/nonexistent/cassette.yaml")).unwrap_err();
        assert!(matches!(err, AuditError::Configuration(_)));
    }
}
