use concord_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::StakeError;

/// One identity's stake and reputation as reported by the staking ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub identity: Identity,
    pub stake: u128,
    /// Standing in `[0, 1]`. Used by sponsorship eligibility, never by tallies.
    pub reputation: f64,
    pub last_updated: Timestamp,
}

impl Stakeholder {
    pub fn new(identity: Identity, stake: u128, reputation: f64, last_updated: Timestamp) -> Self {
        Self {
            identity,
            stake,
            reputation,
            last_updated,
        }
    }

    pub fn validate(&self) -> Result<(), StakeError> {
        if !self.identity.is_valid() {
            return Err(StakeError::InvalidIdentity(self.identity.as_str().to_string()));
        }
        // NaN fails both comparisons.
        if !(self.reputation >= 0.0 && self.reputation <= 1.0) {
            return Err(StakeError::InvalidReputation {
                identity: self.identity.clone(),
                value: self.reputation,
            });
        }
        Ok(())
    }
}
