//! Gas-sponsored transaction batching.
//!
//! Requests are checked against the sponsorship rule and the community's
//! remaining budget, then either submitted straight away or queued. A queued
//! batch flushes as one unit: the whole cost is debited, the relay is called,
//! and on any failure the debit is undone and every transaction stays queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use concord_types::{CommunityId, Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{RelayError, TokenomicsEngine, TokenomicsError};

/// An on-chain action whose cost is paid from a community treasury.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaslessTransaction {
    pub id: String,
    pub community: CommunityId,
    pub requester: Identity,
    /// Opaque reference to the call the relay should carry.
    pub payload_ref: String,
    /// Estimated gas, charged 1:1 against the budget.
    pub estimated_gas: u64,
    pub requested_at: Timestamp,
}

impl GaslessTransaction {
    pub fn cost(&self) -> u128 {
        u128::from(self.estimated_gas)
    }

    fn validate(&self) -> Result<(), TokenomicsError> {
        if self.id.trim().is_empty() {
            return Err(TokenomicsError::Validation("transaction id is empty".into()));
        }
        if !self.community.is_valid() {
            return Err(TokenomicsError::Validation("community is malformed".into()));
        }
        if !self.requester.is_valid() {
            return Err(TokenomicsError::Validation("requester is malformed".into()));
        }
        if self.payload_ref.is_empty() {
            return Err(TokenomicsError::Validation("payload reference is empty".into()));
        }
        Ok(())
    }
}

/// Carries sponsored transactions on-chain.
pub trait SponsorshipRelay: Send + Sync {
    /// Submit a batch as one unit. Returns one relay reference per transaction.
    fn submit_batch(
        &self,
        community: &CommunityId,
        txs: &[GaslessTransaction],
    ) -> Result<Vec<String>, RelayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SponsorshipDecision {
    Approved,
    Denied,
    Queued,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DenialReason {
    NotStakeholder,
    InsufficientStake { stake: u128, required: u64 },
    LowReputation { reputation: f64, required: f64 },
    GasLimitExceeded { requested: u64, max: u64 },
    /// The batch failed to flush too many times and was dropped.
    FlushAttemptsExhausted { attempts: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SponsorshipTicket {
    pub tx_id: String,
    pub decision: SponsorshipDecision,
    pub budget_charged: u128,
    pub relay_ref: Option<String>,
    pub denial: Option<DenialReason>,
}

impl SponsorshipTicket {
    fn approved(tx: &GaslessTransaction, relay_ref: Option<String>) -> Self {
        Self {
            tx_id: tx.id.clone(),
            decision: SponsorshipDecision::Approved,
            budget_charged: tx.cost(),
            relay_ref,
            denial: None,
        }
    }

    fn queued(tx: &GaslessTransaction) -> Self {
        Self {
            tx_id: tx.id.clone(),
            decision: SponsorshipDecision::Queued,
            budget_charged: 0,
            relay_ref: None,
            denial: None,
        }
    }

    fn denied(tx: &GaslessTransaction, reason: DenialReason) -> Self {
        Self {
            tx_id: tx.id.clone(),
            decision: SponsorshipDecision::Denied,
            budget_charged: 0,
            relay_ref: None,
            denial: Some(reason),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BatchOutcome {
    Submitted { charged: u128 },
    /// Debit undone; transactions remain queued for another attempt.
    RolledBack { reason: String, attempt: u32 },
    /// Attempts exhausted; every transaction is denied.
    Dropped { reason: String, attempts: u32 },
}

/// Result of one flush, with the resulting ticket for each transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchReport {
    pub community: CommunityId,
    pub outcome: BatchOutcome,
    pub tickets: Vec<SponsorshipTicket>,
}

impl BatchReport {
    pub fn is_submitted(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Submitted { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SponsorshipResponse {
    /// State of the requested transaction once this call returns.
    pub ticket: SponsorshipTicket,
    /// Set when the request filled the batch and triggered a flush.
    pub flush: Option<BatchReport>,
}

#[derive(Default)]
struct PendingBatch {
    txs: Vec<GaslessTransaction>,
    opened_at: Timestamp,
    attempts: u32,
}

impl PendingBatch {
    fn total_cost(&self) -> Option<u128> {
        self.txs
            .iter()
            .try_fold(0u128, |acc, tx| acc.checked_add(tx.cost()))
    }
}

pub struct GaslessTransactionBatcher {
    engine: Arc<TokenomicsEngine>,
    relay: Arc<dyn SponsorshipRelay>,
    queues: RwLock<HashMap<CommunityId, Arc<Mutex<PendingBatch>>>>,
}

impl GaslessTransactionBatcher {
    pub fn new(engine: Arc<TokenomicsEngine>, relay: Arc<dyn SponsorshipRelay>) -> Self {
        Self {
            engine,
            relay,
            queues: RwLock::new(HashMap::new()),
        }
    }

    fn queue(&self, community: &CommunityId) -> Arc<Mutex<PendingBatch>> {
        if let Some(q) = self
            .queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(community)
        {
            return Arc::clone(q);
        }
        let mut map = self.queues.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(community.clone()).or_default())
    }

    /// Decide on one sponsorship request.
    ///
    /// Ineligible requesters get a `Denied` ticket. A cost larger than the
    /// remaining budget fails with `BudgetExceeded`. Otherwise the transaction
    /// is submitted at once (batching disabled) or queued.
    pub fn request_sponsorship(
        &self,
        tx: GaslessTransaction,
        now: Timestamp,
    ) -> Result<SponsorshipResponse, TokenomicsError> {
        tx.validate()?;
        let community = tx.community.clone();

        if let Err(reason) = self
            .engine
            .check_eligibility(&community, &tx.requester, tx.estimated_gas)
        {
            tracing::info!(tx = %tx.id, %community, requester = %tx.requester, ?reason, "sponsorship denied");
            return Ok(SponsorshipResponse {
                ticket: SponsorshipTicket::denied(&tx, reason),
                flush: None,
            });
        }

        let remaining = self.engine.remaining_budget(&community, now)?;
        if tx.cost() > remaining {
            return Err(TokenomicsError::BudgetExceeded {
                community,
                requested: tx.cost(),
                remaining,
            });
        }

        let batching = &self.engine.config().batching;
        if !batching.enabled {
            let ticket = self.submit_now(&tx, now)?;
            return Ok(SponsorshipResponse { ticket, flush: None });
        }

        let handle = self.queue(&community);
        let mut batch = handle.lock().unwrap_or_else(PoisonError::into_inner);
        if batch.txs.is_empty() {
            batch.opened_at = now;
        }
        batch.txs.push(tx.clone());
        tracing::debug!(tx = %tx.id, %community, queued = batch.txs.len(), "sponsorship queued");

        if batch.txs.len() < batching.max_size {
            return Ok(SponsorshipResponse {
                ticket: SponsorshipTicket::queued(&tx),
                flush: None,
            });
        }

        let report = self.flush_locked(&community, &mut batch, now);
        let ticket = report
            .tickets
            .iter()
            .find(|t| t.tx_id == tx.id)
            .cloned()
            .unwrap_or_else(|| SponsorshipTicket::queued(&tx));
        Ok(SponsorshipResponse {
            ticket,
            flush: Some(report),
        })
    }

    fn submit_now(
        &self,
        tx: &GaslessTransaction,
        now: Timestamp,
    ) -> Result<SponsorshipTicket, TokenomicsError> {
        self.engine.debit(&tx.community, tx.cost(), now)?;
        match self
            .relay
            .submit_batch(&tx.community, std::slice::from_ref(tx))
        {
            Ok(refs) => Ok(SponsorshipTicket::approved(tx, refs.into_iter().next())),
            Err(e) => {
                self.engine.credit(&tx.community, tx.cost(), now)?;
                tracing::warn!(tx = %tx.id, community = %tx.community, error = %e, "relay failed, debit rolled back");
                Err(e.into())
            }
        }
    }

    /// Flush a community's batch regardless of the window.
    pub fn flush(&self, community: &CommunityId, now: Timestamp) -> Option<BatchReport> {
        let handle = self.queue(community);
        let mut batch = handle.lock().unwrap_or_else(PoisonError::into_inner);
        if batch.txs.is_empty() {
            return None;
        }
        Some(self.flush_locked(community, &mut batch, now))
    }

    /// Flush every batch whose wait window has expired.
    pub fn flush_due(&self, now: Timestamp) -> Vec<BatchReport> {
        let max_wait = self.engine.config().batching.max_wait_secs;
        let queues: Vec<_> = self
            .queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(c, q)| (c.clone(), Arc::clone(q)))
            .collect();

        let mut reports = Vec::new();
        for (community, handle) in queues {
            let mut batch = handle.lock().unwrap_or_else(PoisonError::into_inner);
            if batch.txs.is_empty() || !batch.opened_at.has_expired(max_wait, now) {
                continue;
            }
            reports.push(self.flush_locked(&community, &mut batch, now));
        }
        reports
    }

    /// Transactions waiting in a community's batch.
    pub fn pending(&self, community: &CommunityId) -> Vec<GaslessTransaction> {
        self.queue(community)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .txs
            .clone()
    }

    pub fn pending_count(&self) -> usize {
        self.queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|q| q.lock().unwrap_or_else(PoisonError::into_inner).txs.len())
            .sum()
    }

    fn flush_locked(
        &self,
        community: &CommunityId,
        batch: &mut PendingBatch,
        now: Timestamp,
    ) -> BatchReport {
        let attempt = batch.attempts + 1;
        let reason = match batch.total_cost() {
            None => TokenomicsError::Overflow.to_string(),
            Some(total) => match self.engine.debit(community, total, now) {
                Err(e) => e.to_string(),
                Ok(()) => match self.relay.submit_batch(community, &batch.txs) {
                    Ok(refs) => {
                        let txs = std::mem::take(&mut batch.txs);
                        batch.attempts = 0;
                        let mut refs = refs.into_iter();
                        let tickets = txs
                            .iter()
                            .map(|tx| SponsorshipTicket::approved(tx, refs.next()))
                            .collect();
                        tracing::info!(%community, size = txs.len(), charged = %total, "batch flushed");
                        return BatchReport {
                            community: community.clone(),
                            outcome: BatchOutcome::Submitted { charged: total },
                            tickets,
                        };
                    }
                    Err(e) => {
                        if let Err(credit_err) = self.engine.credit(community, total, now) {
                            tracing::error!(%community, error = %credit_err, "failed to roll back batch debit");
                        }
                        e.to_string()
                    }
                },
            },
        };

        batch.attempts = attempt;
        let max_attempts = self.engine.config().max_flush_attempts;
        if attempt >= max_attempts {
            let txs = std::mem::take(&mut batch.txs);
            batch.attempts = 0;
            tracing::warn!(%community, size = txs.len(), attempts = attempt, %reason, "batch dropped");
            let tickets = txs
                .iter()
                .map(|tx| {
                    SponsorshipTicket::denied(
                        tx,
                        DenialReason::FlushAttemptsExhausted { attempts: attempt },
                    )
                })
                .collect();
            return BatchReport {
                community: community.clone(),
                outcome: BatchOutcome::Dropped {
                    reason,
                    attempts: attempt,
                },
                tickets,
            };
        }

        tracing::warn!(%community, size = batch.txs.len(), attempt, %reason, "batch flush rolled back");
        BatchReport {
            community: community.clone(),
            outcome: BatchOutcome::RolledBack { reason, attempt },
            tickets: batch.txs.iter().map(SponsorshipTicket::queued).collect(),
        }
    }
}
