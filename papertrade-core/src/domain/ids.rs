//! Stable strategy identity derived from configuration content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-addressed strategy identifier.
///
/// Two strategy configurations with identical parameters always hash to the
/// same id, so leaderboards and persisted state dedup naturally across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(String);

impl StrategyId {
    /// Hash a canonical serialization of a strategy config into an id.
    ///
    /// The caller is responsible for passing bytes with a deterministic field
    /// order (serde_json over the config struct is enough; field order follows
    /// declaration order).
    pub fn from_config_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex chars, for logs and leaderboard rows.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}
