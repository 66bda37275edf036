//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::governance::{LmdbProposalStore, LmdbVoteStore};
use crate::treasury::LmdbTreasuryStore;
use crate::LmdbError;

/// Names of every database the environment creates.
pub const DATABASES: &[&str] = &[
    "proposals",
    "proposal_states",
    "state_index",
    "votes",
    "treasuries",
];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    proposals: Database<Bytes, Bytes>,
    proposal_states: Database<Bytes, Bytes>,
    state_index: Database<Bytes, Bytes>,
    votes: Database<Bytes, Bytes>,
    treasuries: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path and
        // the memory map is never modified outside of heed transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let proposals = env.create_database(&mut wtxn, Some("proposals"))?;
        let proposal_states = env.create_database(&mut wtxn, Some("proposal_states"))?;
        let state_index = env.create_database(&mut wtxn, Some("state_index"))?;
        let votes = env.create_database(&mut wtxn, Some("votes"))?;
        let treasuries = env.create_database(&mut wtxn, Some("treasuries"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            proposals,
            proposal_states,
            state_index,
            votes,
            treasuries,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn proposal_store(&self) -> LmdbProposalStore {
        LmdbProposalStore {
            env: Arc::clone(&self.env),
            proposals: self.proposals,
            proposal_states: self.proposal_states,
            state_index: self.state_index,
        }
    }

    pub fn vote_store(&self) -> LmdbVoteStore {
        LmdbVoteStore {
            env: Arc::clone(&self.env),
            votes: self.votes,
        }
    }

    pub fn treasury_store(&self) -> LmdbTreasuryStore {
        LmdbTreasuryStore {
            env: Arc::clone(&self.env),
            treasuries: self.treasuries,
        }
    }
}
