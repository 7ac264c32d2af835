//! Per-turn observation log.
//!
//! Append-only while a turn runs, discarded when it ends.

use gitpilot_core::ActionResult;

/// One dispatched action and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub action: String,
    /// Argument string exactly as the model sent it
    pub arguments: String,
    pub result: ActionResult,
}

#[derive(Debug, Clone)]
enum Entry {
    Action {
        thought: Option<String>,
        observation: Observation,
    },
    /// Model output that did not parse; fed back so the model can retry
    InvalidFormat { raw: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    entries: Vec<Entry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, thought: Option<String>, observation: Observation) {
        self.entries.push(Entry::Action {
            thought,
            observation,
        });
    }

    pub fn record_invalid(&mut self, raw: impl Into<String>, reason: impl Into<String>) {
        self.entries.push(Entry::InvalidFormat {
            raw: raw.into(),
            reason: reason.into(),
        });
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.entries
            .into_iter()
            .filter_map(|e| match e {
                Entry::Action { observation, .. } => Some(observation),
                Entry::InvalidFormat { .. } => None,
            })
            .collect()
    }

    /// Render as a ReAct transcript, ending with a `Thought:` cue.
    pub fn to_react_transcript(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                Entry::Action {
                    thought,
                    observation,
                } => {
                    if let Some(thought) = thought {
                        out.push_str(&format!("Thought: {}\n", thought));
                    }
                    out.push_str(&format!("Action: {}\n", observation.action));
                    out.push_str(&format!("Action Input: {}\n", observation.arguments.trim()));
                    out.push_str(&format!(
                        "Observation: {}\n",
                        observation.result.to_observation()
                    ));
                }
                Entry::InvalidFormat { raw, reason } => {
                    out.push_str(raw.trim());
                    out.push('\n');
                    out.push_str(&format!("Observation: Invalid Format: {}\n", reason));
                }
            }
        }
        out.push_str("Thought:");
        out
    }
}
