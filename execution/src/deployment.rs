use concord_types::ProposalId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("deployment failed: {0}")]
pub struct DeploymentError(pub String);

/// Whatever provisions a passed proposal's requested budget.
///
/// Calls may be repeated for the same proposal after a failure, so
/// implementations must treat `proposal_id` as an idempotency key.
pub trait DeploymentTarget: Send + Sync {
    /// Returns an opaque reference to the deployment.
    fn deploy(&self, proposal_id: &ProposalId, budget: u64) -> Result<String, DeploymentError>;
}
