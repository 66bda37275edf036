//! Fee lookup, sponsorship eligibility and treasury accounting.
//!
//! Every community's treasury sits behind its own mutex, so budget updates
//! for one community never wait on another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use concord_stake::StakeholderRegistry;
use concord_store::TreasuryStore;
use concord_types::{CommunityId, Identity, Timestamp};

use crate::batcher::DenialReason;
use crate::config::apply_bps;
use crate::{TokenomicsConfig, TokenomicsError, Treasury};

pub struct TokenomicsEngine {
    config: Arc<TokenomicsConfig>,
    stake: Arc<StakeholderRegistry>,
    store: Arc<dyn TreasuryStore>,
    treasuries: RwLock<HashMap<CommunityId, Arc<Mutex<Treasury>>>>,
}

impl TokenomicsEngine {
    pub fn new(
        config: Arc<TokenomicsConfig>,
        stake: Arc<StakeholderRegistry>,
        store: Arc<dyn TreasuryStore>,
    ) -> Result<Self, TokenomicsError> {
        config.validate()?;
        Ok(Self {
            config,
            stake,
            store,
            treasuries: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &TokenomicsConfig {
        &self.config
    }

    pub fn fee_bps_for(&self, volume: u128, community: &CommunityId) -> u32 {
        self.config.fee_structure(community).fee_bps_for(volume)
    }

    /// Fee owed on `volume` under the community's fee structure.
    pub fn fee_for(&self, volume: u128, community: &CommunityId) -> u128 {
        self.config.fee_structure(community).fee_for(volume)
    }

    /// Fee a member pays, with their community stake standing in for volume.
    pub fn member_fee(&self, community: &CommunityId, member: &Identity, amount: u128) -> u128 {
        let volume = self.stake.stake_of(community, member);
        apply_bps(amount, self.fee_bps_for(volume, community))
    }

    /// Check the sponsorship rule against the current stake snapshot.
    pub fn check_eligibility(
        &self,
        community: &CommunityId,
        requester: &Identity,
        gas: u64,
    ) -> Result<(), DenialReason> {
        let rule = &self.config.sponsorship;
        if gas > rule.max_gas_per_tx {
            return Err(DenialReason::GasLimitExceeded {
                requested: gas,
                max: rule.max_gas_per_tx,
            });
        }
        let snapshot = self.stake.snapshot(community);
        let Some(holder) = snapshot.get(requester) else {
            if rule.require_stakeholder {
                return Err(DenialReason::NotStakeholder);
            }
            return Ok(());
        };
        if holder.stake < u128::from(rule.min_stake) {
            return Err(DenialReason::InsufficientStake {
                stake: holder.stake,
                required: rule.min_stake,
            });
        }
        if holder.reputation < rule.min_reputation {
            return Err(DenialReason::LowReputation {
                reputation: holder.reputation,
                required: rule.min_reputation,
            });
        }
        Ok(())
    }

    fn treasury(&self, community: &CommunityId, now: Timestamp) -> Result<Arc<Mutex<Treasury>>, TokenomicsError> {
        if let Some(t) = self
            .treasuries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(community)
        {
            return Ok(Arc::clone(t));
        }

        let budget = self.config.budget_for(community);
        let loaded = match self.store.get_treasury(community)? {
            Some(bytes) => {
                let mut t = Treasury::decode(&bytes)?;
                t.budget_per_period = budget;
                t
            }
            None => Treasury::new(community.clone(), budget, now),
        };

        let mut map = self
            .treasuries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            map.entry(community.clone())
                .or_insert_with(|| Arc::new(Mutex::new(loaded))),
        ))
    }

    /// Run `f` against the community's treasury, rolled to `now`, and
    /// persist the result if `f` succeeds.
    fn with_treasury<R>(
        &self,
        community: &CommunityId,
        now: Timestamp,
        f: impl FnOnce(&mut Treasury) -> Result<R, TokenomicsError>,
    ) -> Result<R, TokenomicsError> {
        let handle = self.treasury(community, now)?;
        let mut guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
        let mut working = guard.clone();
        if working.roll(now, self.config.accounting_period_secs) {
            tracing::info!(%community, period_start = %working.period_start, "treasury period rolled over");
        }
        let out = f(&mut working)?;
        if working != *guard {
            self.store.put_treasury(community, &working.encode()?)?;
            *guard = working;
        }
        Ok(out)
    }

    pub fn remaining_budget(&self, community: &CommunityId, now: Timestamp) -> Result<u128, TokenomicsError> {
        self.with_treasury(community, now, |t| Ok(t.remaining()))
    }

    pub fn treasury_snapshot(&self, community: &CommunityId, now: Timestamp) -> Result<Treasury, TokenomicsError> {
        self.with_treasury(community, now, |t| Ok(t.clone()))
    }

    /// Debit `amount`, failing with `BudgetExceeded` and leaving the budget
    /// untouched if it does not fit.
    pub fn debit(&self, community: &CommunityId, amount: u128, now: Timestamp) -> Result<(), TokenomicsError> {
        self.with_treasury(community, now, |t| t.debit(amount))?;
        tracing::debug!(%community, amount = %amount, "treasury debited");
        Ok(())
    }

    pub fn credit(&self, community: &CommunityId, amount: u128, now: Timestamp) -> Result<(), TokenomicsError> {
        self.with_treasury(community, now, |t| {
            t.credit(amount);
            Ok(())
        })?;
        tracing::debug!(%community, amount = %amount, "treasury credited");
        Ok(())
    }
}
