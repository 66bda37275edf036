//! Nullable staking ledger.

use concord_stake::{StakeError, Stakeholder, StakingLedger};
use concord_types::CommunityId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A staking ledger whose balances are set by the test.
///
/// Unknown communities have no stakeholders.
#[derive(Default)]
pub struct NullStakingLedger {
    balances: Mutex<HashMap<CommunityId, Vec<Stakeholder>>>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl NullStakingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stakeholders the ledger reports for `community`.
    pub fn set(&self, community: &CommunityId, stakeholders: Vec<Stakeholder>) {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(community.clone(), stakeholders);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of snapshot calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl StakingLedger for NullStakingLedger {
    fn snapshot(&self, community: &CommunityId) -> Result<Vec<Stakeholder>, StakeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StakeError::Ledger("null ledger offline".into()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(community)
            .cloned()
            .unwrap_or_default())
    }
}
