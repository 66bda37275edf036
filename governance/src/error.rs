use concord_store::StoreError;
use concord_types::{ProposalId, ProposalState};
use thiserror::Error;

use crate::plan::PlanError;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("cannot {action} a proposal in state {state}")]
    InvalidState {
        state: ProposalState,
        action: &'static str,
    },

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("voting closed: {0}")]
    VotingClosed(String),

    #[error("tally failed: {0}")]
    Tally(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<PlanError> for GovernanceError {
    fn from(e: PlanError) -> Self {
        Self::Validation(e.to_string())
    }
}
