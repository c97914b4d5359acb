//! Engine state persistence: JSON snapshot across restarts.
//!
//! The snapshot carries the ledger (portfolio and policy), the active
//! strategy, and the optimizer settings, so a restarted engine resumes with
//! the same book instead of a fresh balance. Writes go through a temp file
//! and rename, so a crash mid-save never leaves a truncated snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::active::ActiveStrategy;
use crate::optimizer::OptimizerConfig;
use papertrade_core::ledger::Ledger;
use papertrade_core::risk::RiskProfile;

pub const STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot schema version {found} not supported (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
}

fn default_schema_version() -> u32 {
    STATE_SCHEMA_VERSION
}

/// Everything needed to resume the engine where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub risk_profile: RiskProfile,
    pub ledger: Ledger,
    pub active: Option<ActiveStrategy>,
    pub optimizer: OptimizerConfig,
    pub saved_at: DateTime<Utc>,
}

impl EngineState {
    pub fn new(
        risk_profile: RiskProfile,
        ledger: Ledger,
        active: Option<ActiveStrategy>,
        optimizer: OptimizerConfig,
    ) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            risk_profile,
            ledger,
            active,
            optimizer,
            saved_at: Utc::now(),
        }
    }
}

/// Write the snapshot atomically.
pub fn save(path: &Path, state: &EngineState) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    info!(path = %path.display(), "engine state saved");
    Ok(())
}

/// Load a snapshot. `Ok(None)` when no snapshot exists yet; a present but
/// unreadable snapshot is an error rather than a silent fresh start.
pub fn load(path: &Path) -> Result<Option<EngineState>, PersistError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let state: EngineState = serde_json::from_str(&content)?;
    if state.schema_version != STATE_SCHEMA_VERSION {
        return Err(PersistError::SchemaVersion {
            found: state.schema_version,
            expected: STATE_SCHEMA_VERSION,
        });
    }
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade_core::risk::RiskProfile;

    fn state() -> EngineState {
        let profile = RiskProfile::Default;
        EngineState::new(
            profile,
            Ledger::new(profile.policy()),
            None,
            OptimizerConfig::default(),
        )
    }

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let original = state();
        save(&path, &original).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.schema_version, STATE_SCHEMA_VERSION);
        assert_eq!(loaded.risk_profile, original.risk_profile);
        assert_eq!(
            loaded.ledger.portfolio().cash,
            original.ledger.portfolio().cash
        );
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(PersistError::Json(_))));
    }

    #[test]
    fn future_schema_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut s = state();
        s.schema_version = STATE_SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&s).unwrap();
        std::fs::write(&path, json).unwrap();
        assert!(matches!(
            load(&path),
            Err(PersistError::SchemaVersion { .. })
        ));
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save(&path, &state()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }
}
