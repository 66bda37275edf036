use concord_store::StoreError;
use concord_types::CommunityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenomicsError {
    #[error("budget exceeded for {community}: requested {requested}, remaining {remaining}")]
    BudgetExceeded {
        community: CommunityId,
        requested: u128,
        remaining: u128,
    },

    #[error("invalid transaction: {0}")]
    Validation(String),

    #[error("invalid tokenomics configuration: {0}")]
    InvalidConfig(String),

    #[error("relay failure: {0}")]
    Relay(#[from] RelayError),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A sponsorship relay refused or failed to carry a batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("relay rejected batch: {0}")]
pub struct RelayError(pub String);
