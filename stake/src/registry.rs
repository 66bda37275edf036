//! Per-community stake snapshots.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use concord_types::{CommunityId, Identity, Timestamp};

use crate::{StakeError, Stakeholder, StakingLedger};

/// An immutable stake view of one community at one point in time.
///
/// Tallies take one of these so that every weight in a single computation
/// comes from the same refresh.
#[derive(Clone, Debug, Default)]
pub struct StakeSnapshot {
    members: HashMap<Identity, Stakeholder>,
    total: u128,
    taken_at: Timestamp,
}

impl StakeSnapshot {
    pub fn from_stakeholders(
        community: &CommunityId,
        holders: Vec<Stakeholder>,
        taken_at: Timestamp,
    ) -> Result<Self, StakeError> {
        let mut members = HashMap::with_capacity(holders.len());
        let mut total: u128 = 0;
        for holder in holders {
            holder.validate()?;
            total = total
                .checked_add(holder.stake)
                .ok_or_else(|| StakeError::Overflow(community.clone()))?;
            let id = holder.identity.clone();
            if members.insert(id.clone(), holder).is_some() {
                return Err(StakeError::DuplicateStakeholder(id));
            }
        }
        Ok(Self {
            members,
            total,
            taken_at,
        })
    }

    /// Stake of `identity`, zero when unknown.
    pub fn stake_of(&self, identity: &Identity) -> u128 {
        self.members.get(identity).map_or(0, |h| h.stake)
    }

    pub fn total_stake(&self) -> u128 {
        self.total
    }

    pub fn get(&self, identity: &Identity) -> Option<&Stakeholder> {
        self.members.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.members.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn taken_at(&self) -> Timestamp {
        self.taken_at
    }
}

/// Read-shared registry of stake and reputation, one snapshot per community.
///
/// Snapshots are swapped whole; readers holding an `Arc<StakeSnapshot>` keep
/// a consistent view while a refresh lands.
#[derive(Default)]
pub struct StakeholderRegistry {
    communities: RwLock<HashMap<CommunityId, Arc<StakeSnapshot>>>,
}

impl StakeholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a community's snapshot. Nothing changes if any entry is invalid.
    pub fn apply_snapshot(
        &self,
        community: &CommunityId,
        holders: Vec<Stakeholder>,
        now: Timestamp,
    ) -> Result<usize, StakeError> {
        let snapshot = StakeSnapshot::from_stakeholders(community, holders, now)?;
        let count = snapshot.len();
        let total = snapshot.total_stake();
        self.communities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(community.clone(), Arc::new(snapshot));
        tracing::debug!(%community, stakeholders = count, total_stake = %total, "stake snapshot applied");
        Ok(count)
    }

    /// Pull a fresh snapshot for `community` from the staking ledger.
    pub fn refresh(
        &self,
        community: &CommunityId,
        ledger: &dyn StakingLedger,
        now: Timestamp,
    ) -> Result<usize, StakeError> {
        let holders = ledger.snapshot(community)?;
        self.apply_snapshot(community, holders, now)
    }

    /// Refresh every community in `communities`, returning the ones that failed.
    pub fn refresh_all<'a>(
        &self,
        communities: impl IntoIterator<Item = &'a CommunityId>,
        ledger: &dyn StakingLedger,
        now: Timestamp,
    ) -> Vec<(CommunityId, StakeError)> {
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        for community in communities {
            if !seen.insert(community) {
                continue;
            }
            if let Err(e) = self.refresh(community, ledger, now) {
                tracing::warn!(%community, error = %e, "stake refresh failed, keeping previous snapshot");
                failures.push((community.clone(), e));
            }
        }
        failures
    }

    /// Current snapshot for a community; empty if none was ever applied.
    pub fn snapshot(&self, community: &CommunityId) -> Arc<StakeSnapshot> {
        self.communities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(community)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stake_of(&self, community: &CommunityId, identity: &Identity) -> u128 {
        self.snapshot(community).stake_of(identity)
    }

    pub fn total_stake(&self, community: &CommunityId) -> u128 {
        self.snapshot(community).total_stake()
    }

    pub fn reputation_of(&self, community: &CommunityId, identity: &Identity) -> Option<f64> {
        self.snapshot(community).get(identity).map(|h| h.reputation)
    }

    pub fn get(&self, community: &CommunityId, identity: &Identity) -> Option<Stakeholder> {
        self.snapshot(community).get(identity).cloned()
    }

    pub fn is_stakeholder(&self, community: &CommunityId, identity: &Identity) -> bool {
        self.snapshot(community).contains(identity)
    }

    pub fn communities(&self) -> Vec<CommunityId> {
        self.communities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
