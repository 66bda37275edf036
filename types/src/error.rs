//! Errors raised while parsing or validating shared types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("unknown proposal kind: {0}")]
    UnknownKind(String),

    #[error("invalid governance parameter: {0}")]
    InvalidParam(String),
}
