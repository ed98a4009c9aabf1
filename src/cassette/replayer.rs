//! Serves recorded outcomes back to the replaying adapters.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use super::format::Cassette;

/// Calls are matched on port, method, and the exact input, so concurrent
/// callers get their own recorded outcome regardless of arrival order.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct ReplayKey {
    port: String,
    method: String,
    input: String,
}

impl ReplayKey {
    fn new(port: &str, method: &str, input: &Value) -> Self {
        // serde_json maps are ordered, so equal inputs render identically.
        Self { port: port.to_string(), method: method.to_string(), input: input.to_string() }
    }
}

/// A call the cassette cannot answer.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Nothing was recorded for this call.
    #[error("cassette has no {port}::{method} interaction for input {input}")]
    Unrecorded {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Rendered input.
        input: String,
    },
    /// Every recording of this call has been served.
    #[error("cassette exhausted: {port}::{method} for input {input} replayed {count} times")]
    Exhausted {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Rendered input.
        input: String,
        /// Recordings that were available.
        count: usize,
    },
}

/// Replays a cassette, serving repeated identical calls in recording order.
pub struct CassetteReplayer {
    queues: HashMap<ReplayKey, VecDeque<Value>>,
    served: HashMap<ReplayKey, usize>,
}

impl CassetteReplayer {
    /// Indexes the interactions of `cassette`.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut interactions: Vec<_> = cassette.interactions.iter().collect();
        interactions.sort_by_key(|interaction| interaction.seq);

        let mut queues: HashMap<ReplayKey, VecDeque<Value>> = HashMap::new();
        for interaction in interactions {
            queues
                .entry(ReplayKey::new(&interaction.port, &interaction.method, &interaction.input))
                .or_default()
                .push_back(interaction.output.clone());
        }
        Self { queues, served: HashMap::new() }
    }

    /// Returns the next recorded output for this exact call.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] if the call was never recorded or all its
    /// recordings were already served.
    pub fn next_output(
        &mut self,
        port: &str,
        method: &str,
        input: &Value,
    ) -> Result<Value, ReplayError> {
        let key = ReplayKey::new(port, method, input);
        let Some(queue) = self.queues.get_mut(&key) else {
            return Err(ReplayError::Unrecorded {
                port: key.port,
                method: key.method,
                input: key.input,
            });
        };
        if let Some(output) = queue.pop_front() {
            *self.served.entry(key).or_default() += 1;
            return Ok(output);
        }
        let count = self.served.get(&key).copied().unwrap_or_default();
        Err(ReplayError::Exhausted { port: key.port, method: key.method, input: key.input, count })
    }

    /// Recorded outputs not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}
