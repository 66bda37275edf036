use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// How long a phase may stay blocked before the whole run fails.
    pub blocked_grace_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            blocked_grace_secs: 7 * 24 * 3600,
        }
    }
}
