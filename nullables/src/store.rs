//! Nullable store: thread-safe in-memory storage.

use concord_store::{ProposalStore, StoreError, TreasuryStore, VoteStore};
use concord_types::{CommunityId, Identity, ProposalId, ProposalState};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An in-memory proposal, vote and treasury store.
///
/// Thread-safe for use with tokio's multi-threaded runtime. Writes can be
/// made to fail on demand to exercise error paths.
#[derive(Default)]
pub struct NullStore {
    proposals: Mutex<HashMap<ProposalId, (ProposalState, Vec<u8>)>>,
    votes: Mutex<BTreeMap<(ProposalId, Identity), Vec<u8>>>,
    treasuries: Mutex<BTreeMap<CommunityId, Vec<u8>>>,
    fail_writes: AtomicBool,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn proposal_count(&self) -> usize {
        guard(&self.proposals).len()
    }

    pub fn vote_count(&self) -> usize {
        guard(&self.votes).len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        Ok(())
    }
}

impl ProposalStore for NullStore {
    fn put_proposal(
        &self,
        id: &ProposalId,
        state: ProposalState,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        guard(&self.proposals).insert(*id, (state, data.to_vec()));
        Ok(())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(guard(&self.proposals).get(id).map(|(_, data)| data.clone()))
    }

    fn list_by_state(&self, state: ProposalState) -> Result<Vec<ProposalId>, StoreError> {
        let mut ids: Vec<_> = guard(&self.proposals)
            .iter()
            .filter(|(_, (s, _))| *s == state)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError> {
        let mut ids: Vec<_> = guard(&self.proposals).keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl VoteStore for NullStore {
    fn put_vote(
        &self,
        proposal: &ProposalId,
        voter: &Identity,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        guard(&self.votes).insert((*proposal, voter.clone()), data.to_vec());
        Ok(())
    }

    fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &Identity,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(guard(&self.votes).get(&(*proposal, voter.clone())).cloned())
    }

    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(guard(&self.votes)
            .iter()
            .filter(|((p, _), _)| p == proposal)
            .map(|(_, data)| data.clone())
            .collect())
    }
}

impl TreasuryStore for NullStore {
    fn put_treasury(&self, community: &CommunityId, data: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        guard(&self.treasuries).insert(community.clone(), data.to_vec());
        Ok(())
    }

    fn get_treasury(&self, community: &CommunityId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(guard(&self.treasuries).get(community).cloned())
    }

    fn list_communities(&self) -> Result<Vec<CommunityId>, StoreError> {
        Ok(guard(&self.treasuries).keys().cloned().collect())
    }
}
