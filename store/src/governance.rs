//! Proposal and vote storage traits.

use crate::StoreError;
use concord_types::{Identity, ProposalId, ProposalState};

/// Storage for proposal records, indexed by id and by lifecycle state.
pub trait ProposalStore: Send + Sync {
    /// Store (or overwrite) a proposal. `state` keeps the state index current.
    fn put_proposal(
        &self,
        id: &ProposalId,
        state: ProposalState,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Get a proposal by id.
    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Vec<u8>>, StoreError>;

    /// List the ids of every proposal currently in `state`.
    fn list_by_state(&self, state: ProposalState) -> Result<Vec<ProposalId>, StoreError>;

    /// List the ids of every stored proposal.
    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError>;
}

/// Storage for the per-proposal vote ledger.
pub trait VoteStore: Send + Sync {
    /// Store (or replace) `voter`'s vote on `proposal`.
    fn put_vote(
        &self,
        proposal: &ProposalId,
        voter: &Identity,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Get a specific voter's vote on a proposal.
    fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &Identity,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Get all votes for a proposal.
    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<Vec<u8>>, StoreError>;
}
