//! A staking ledger backed by an operator-maintained TOML file.
//!
//! ```toml
//! [[communities]]
//! id = "riverside"
//!
//! [[communities.stakeholders]]
//! identity = "alice"
//! stake = 3000
//! reputation = 0.9
//! ```
//!
//! The file is re-read on every snapshot, so edits are picked up by the next
//! sweep without a restart.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use concord_stake::{StakeError, Stakeholder, StakingLedger};
use concord_types::{CommunityId, Identity, Timestamp};

#[derive(Debug, Deserialize)]
struct StakeFileContents {
    #[serde(default)]
    communities: Vec<CommunityEntry>,
}

#[derive(Debug, Deserialize)]
struct CommunityEntry {
    id: CommunityId,
    #[serde(default)]
    stakeholders: Vec<StakeEntry>,
}

#[derive(Debug, Deserialize)]
struct StakeEntry {
    identity: Identity,
    stake: u64,
    #[serde(default)]
    reputation: f64,
}

pub struct StakeFileLedger {
    path: PathBuf,
}

impl StakeFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StakeFileContents, StakeError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| StakeError::Ledger(format!("{}: {e}", self.path.display())))?;
        toml::from_str(&text)
            .map_err(|e| StakeError::Ledger(format!("{}: {e}", self.path.display())))
    }
}

impl StakingLedger for StakeFileLedger {
    fn snapshot(&self, community: &CommunityId) -> Result<Vec<Stakeholder>, StakeError> {
        let now = Timestamp::now();
        let contents = self.read()?;
        Ok(contents
            .communities
            .into_iter()
            .filter(|c| &c.id == community)
            .flat_map(|c| c.stakeholders)
            .map(|s| Stakeholder::new(s.identity, u128::from(s.stake), s.reputation, now))
            .collect())
    }
}
