//! Dispatch of passed proposals' budgets to the deployment target.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use concord_execution::DeploymentTarget;
use concord_governance::Proposal;
use concord_types::ProposalId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Deployed(String),
    /// Dispatched on an earlier sweep.
    AlreadyDeployed(String),
    /// No budget was requested.
    NotRequested,
    /// Will be retried on the next sweep.
    Failed { attempts: u32, error: String },
    /// Attempts exhausted; no further calls are made.
    GaveUp { attempts: u32 },
}

#[derive(Default)]
struct DispatchRecord {
    attempts: u32,
    reference: Option<String>,
}

/// Remembers which proposals were deployed so each is deployed once, and
/// retries failures up to `max_attempts`.
pub struct DeploymentDispatcher {
    target: Arc<dyn DeploymentTarget>,
    max_attempts: u32,
    records: Mutex<HashMap<ProposalId, DispatchRecord>>,
}

impl DeploymentDispatcher {
    pub fn new(target: Arc<dyn DeploymentTarget>, max_attempts: u32) -> Self {
        Self {
            target,
            max_attempts: max_attempts.max(1),
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn dispatch(&self, proposal: &Proposal) -> DispatchOutcome {
        let Some(budget) = proposal.budget_request.filter(|b| *b > 0) else {
            return DispatchOutcome::NotRequested;
        };
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(proposal.id).or_default();
        if let Some(reference) = &record.reference {
            return DispatchOutcome::AlreadyDeployed(reference.clone());
        }
        if record.attempts >= self.max_attempts {
            return DispatchOutcome::GaveUp {
                attempts: record.attempts,
            };
        }

        record.attempts += 1;
        match self.target.deploy(&proposal.id, budget) {
            Ok(reference) => {
                tracing::info!(proposal = %proposal.id, budget, %reference, "budget deployed");
                record.reference = Some(reference.clone());
                DispatchOutcome::Deployed(reference)
            }
            Err(e) if record.attempts >= self.max_attempts => {
                tracing::error!(proposal = %proposal.id, attempts = record.attempts, error = %e, "deployment abandoned");
                DispatchOutcome::GaveUp {
                    attempts: record.attempts,
                }
            }
            Err(e) => {
                tracing::warn!(proposal = %proposal.id, attempt = record.attempts, error = %e, "deployment failed, will retry");
                DispatchOutcome::Failed {
                    attempts: record.attempts,
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn reference(&self, id: &ProposalId) -> Option<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .and_then(|r| r.reference.clone())
    }
}
