use concord_governance::GovernanceError;
use concord_types::ProposalId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no execution run for proposal {0}")]
    RunNotFound(ProposalId),

    #[error("unknown phase {0}")]
    UnknownPhase(String),

    #[error("phase {phase} has no criterion {criterion:?}")]
    UnknownCriterion { phase: String, criterion: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("project {0} not found")]
    ProjectNotFound(String),

    #[error(transparent)]
    Governance(#[from] GovernanceError),
}
