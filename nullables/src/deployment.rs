//! Nullable deployment target.

use concord_execution::{DeploymentError, DeploymentTarget};
use concord_types::ProposalId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Records deployments keyed by proposal. A repeated deploy for the same
/// proposal returns the original reference.
#[derive(Default)]
pub struct NullDeployment {
    deployed: Mutex<BTreeMap<ProposalId, (u64, String)>>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl NullDeployment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn deployed(&self) -> Vec<(ProposalId, u64)> {
        self.deployed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, (budget, _))| (*id, *budget))
            .collect()
    }
}

impl DeploymentTarget for NullDeployment {
    fn deploy(&self, proposal_id: &ProposalId, budget: u64) -> Result<String, DeploymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DeploymentError("null deployment refused".into()));
        }
        let mut deployed = self.deployed.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = deployed
            .entry(*proposal_id)
            .or_insert_with(|| (budget, format!("deploy-{}", proposal_id.to_hex())));
        Ok(entry.1.clone())
    }
}
