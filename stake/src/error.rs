use concord_types::{CommunityId, Identity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakeError {
    #[error("reputation {value} for {identity} is outside [0, 1]")]
    InvalidReputation { identity: Identity, value: f64 },

    #[error("malformed identity: {0:?}")]
    InvalidIdentity(String),

    #[error("identity {0} appears twice in one snapshot")]
    DuplicateStakeholder(Identity),

    #[error("total stake overflow in community {0}")]
    Overflow(CommunityId),

    #[error("staking ledger unavailable: {0}")]
    Ledger(String),
}
