//! LMDB implementation of ProposalStore and VoteStore.
//!
//! Layout:
//! - `proposals`: `id (32)` → record bytes
//! - `proposal_states`: `id (32)` → state name (lets a rewrite find the stale index entry)
//! - `state_index`: `state name ‖ 0x00 ‖ id (32)` → empty
//! - `votes`: `proposal id (32) ‖ voter` → record bytes

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use concord_store::governance::{ProposalStore, VoteStore};
use concord_store::StoreError;
use concord_types::{Identity, ProposalId, ProposalState};

use crate::LmdbError;

fn state_key(state: &[u8], id: &ProposalId) -> Vec<u8> {
    let mut key = Vec::with_capacity(state.len() + 33);
    key.extend_from_slice(state);
    key.push(0);
    key.extend_from_slice(id.as_bytes());
    key
}

fn state_prefix(state: ProposalState) -> Vec<u8> {
    let mut prefix = state.as_str().as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn id_from_slice(bytes: &[u8]) -> Result<ProposalId, LmdbError> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization(format!("bad proposal id length {}", bytes.len())))?;
    Ok(ProposalId::new(arr))
}

fn vote_key(proposal: &ProposalId, voter: &Identity) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + voter.as_str().len());
    key.extend_from_slice(proposal.as_bytes());
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

pub struct LmdbProposalStore {
    pub(crate) env: Arc<Env>,
    pub(crate) proposals: Database<Bytes, Bytes>,
    pub(crate) proposal_states: Database<Bytes, Bytes>,
    pub(crate) state_index: Database<Bytes, Bytes>,
}

impl ProposalStore for LmdbProposalStore {
    fn put_proposal(
        &self,
        id: &ProposalId,
        state: ProposalState,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let previous = self
            .proposal_states
            .get(&wtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .map(|s| s.to_vec());
        if let Some(old) = previous {
            self.state_index
                .delete(&mut wtxn, &state_key(&old, id))
                .map_err(LmdbError::from)?;
        }
        let state_name = state.as_str().as_bytes();
        self.proposals
            .put(&mut wtxn, id.as_bytes(), data)
            .map_err(LmdbError::from)?;
        self.proposal_states
            .put(&mut wtxn, id.as_bytes(), state_name)
            .map_err(LmdbError::from)?;
        self.state_index
            .put(&mut wtxn, &state_key(state_name, id), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .proposals
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn list_by_state(&self, state: ProposalState) -> Result<Vec<ProposalId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = state_prefix(state);
        let mut ids = Vec::new();
        for entry in self
            .state_index
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?
        {
            let (key, _) = entry.map_err(LmdbError::from)?;
            ids.push(id_from_slice(&key[prefix.len()..])?);
        }
        Ok(ids)
    }

    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for entry in self.proposals.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, _) = entry.map_err(LmdbError::from)?;
            ids.push(id_from_slice(key)?);
        }
        Ok(ids)
    }
}

pub struct LmdbVoteStore {
    pub(crate) env: Arc<Env>,
    pub(crate) votes: Database<Bytes, Bytes>,
}

impl VoteStore for LmdbVoteStore {
    fn put_vote(
        &self,
        proposal: &ProposalId,
        voter: &Identity,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.votes
            .put(&mut wtxn, &vote_key(proposal, voter), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &Identity,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .votes
            .get(&rtxn, &vote_key(proposal, voter))
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in self
            .votes
            .prefix_iter(&rtxn, proposal.as_bytes())
            .map_err(LmdbError::from)?
        {
            let (_, value) = entry.map_err(LmdbError::from)?;
            out.push(value.to_vec());
        }
        Ok(out)
    }
}
