//! Nullable sponsorship relay: records batches instead of submitting them.

use concord_tokenomics::{GaslessTransaction, RelayError, SponsorshipRelay};
use concord_types::CommunityId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct NullRelay {
    submitted: Mutex<Vec<(CommunityId, Vec<String>)>>,
    failing: AtomicBool,
}

impl NullRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every batch until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every accepted batch as (community, transaction ids).
    pub fn batches(&self) -> Vec<(CommunityId, Vec<String>)> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SponsorshipRelay for NullRelay {
    fn submit_batch(
        &self,
        community: &CommunityId,
        txs: &[GaslessTransaction],
    ) -> Result<Vec<String>, RelayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError("null relay rejecting batches".into()));
        }
        let mut submitted = self.submitted.lock().unwrap_or_else(PoisonError::into_inner);
        let batch = submitted.len();
        submitted.push((community.clone(), txs.iter().map(|tx| tx.id.clone()).collect()));
        Ok(txs
            .iter()
            .enumerate()
            .map(|(i, _)| format!("null-{batch}-{i}"))
            .collect())
    }
}
