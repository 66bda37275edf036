//! Community treasury budget with accounting-period rollover.

use concord_types::{CommunityId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::TokenomicsError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    pub community: CommunityId,
    pub budget_per_period: u128,
    pub period_start: Timestamp,
    /// Debited in the current period.
    pub spent: u128,
    pub lifetime_spent: u128,
}

impl Treasury {
    pub fn new(community: CommunityId, budget_per_period: u128, period_start: Timestamp) -> Self {
        Self {
            community,
            budget_per_period,
            period_start,
            spent: 0,
            lifetime_spent: 0,
        }
    }

    /// Move into the period containing `now`, resetting `spent`.
    /// Returns `true` when a new period began.
    pub fn roll(&mut self, now: Timestamp, period_secs: u64) -> bool {
        let elapsed = self.period_start.elapsed_since(now);
        if period_secs == 0 || elapsed < period_secs {
            return false;
        }
        let whole = elapsed - elapsed % period_secs;
        self.period_start = self.period_start.plus_secs(whole);
        self.spent = 0;
        true
    }

    pub fn remaining(&self) -> u128 {
        self.budget_per_period.saturating_sub(self.spent)
    }

    pub fn debit(&mut self, amount: u128) -> Result<(), TokenomicsError> {
        let remaining = self.remaining();
        if amount > remaining {
            return Err(TokenomicsError::BudgetExceeded {
                community: self.community.clone(),
                requested: amount,
                remaining,
            });
        }
        self.spent = self.spent.checked_add(amount).ok_or(TokenomicsError::Overflow)?;
        self.lifetime_spent = self
            .lifetime_spent
            .checked_add(amount)
            .ok_or(TokenomicsError::Overflow)?;
        Ok(())
    }

    /// Undo a debit from the current period.
    pub fn credit(&mut self, amount: u128) {
        self.spent = self.spent.saturating_sub(amount);
        self.lifetime_spent = self.lifetime_spent.saturating_sub(amount);
    }

    pub fn encode(&self) -> Result<Vec<u8>, TokenomicsError> {
        bincode::serialize(self).map_err(|e| TokenomicsError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TokenomicsError> {
        bincode::deserialize(bytes).map_err(|e| TokenomicsError::Serialization(e.to_string()))
    }
}
