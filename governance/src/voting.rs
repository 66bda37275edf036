//! Stake-weighted voting.
//!
//! The ledger keeps at most one vote per voter; a later vote replaces the
//! earlier one. Tallies are recomputed from the ledger and a stake snapshot
//! every time, so replaying the same inputs always gives the same decision.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use concord_stake::{StakeSnapshot, StakeholderRegistry};
use concord_store::VoteStore;
use concord_types::{GovernanceParams, Identity, ProposalId, ProposalState, Timestamp, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::events::{EventBus, GovernanceEvent};
use crate::proposal::Proposal;
use crate::registry::ProposalRegistry;
use crate::signature::{vote_payload, SignatureVerifier};
use crate::GovernanceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteOption {
    For,
    Against,
    Abstain,
}

impl VoteOption {
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::For => 0,
            Self::Against => 1,
            Self::Abstain => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: ProposalId,
    pub voter: Identity,
    pub option: VoteOption,
    pub signature: Vec<u8>,
    pub cast_at: Timestamp,
    /// Receipt order within the proposal.
    pub sequence: u64,
    /// The voter's signed nonce.
    pub nonce: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteRequest {
    pub proposal_id: ProposalId,
    pub voter: Identity,
    pub option: VoteOption,
    pub signature: Vec<u8>,
    /// Must exceed the nonce of the voter's current vote on this proposal.
    pub nonce: u64,
}

/// Vote counts per option. Stake is only applied when the tally runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningSnapshot {
    pub for_votes: u32,
    pub against_votes: u32,
    pub abstain_votes: u32,
}

impl RunningSnapshot {
    fn add(&mut self, option: VoteOption) {
        let slot = self.slot(option);
        *slot += 1;
    }

    fn remove(&mut self, option: VoteOption) {
        let slot = self.slot(option);
        *slot = slot.saturating_sub(1);
    }

    fn slot(&mut self, option: VoteOption) -> &mut u32 {
        match option {
            VoteOption::For => &mut self.for_votes,
            VoteOption::Against => &mut self.against_votes,
            VoteOption::Abstain => &mut self.abstain_votes,
        }
    }

    pub fn voters(&self) -> u32 {
        self.for_votes + self.against_votes + self.abstain_votes
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteAck {
    pub proposal_id: ProposalId,
    pub voter: Identity,
    pub option: VoteOption,
    pub sequence: u64,
    /// The option this vote replaced, if the voter had voted before.
    pub replaced: Option<VoteOption>,
    pub snapshot: RunningSnapshot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    QuorumNotMet { participation_bps: u32, required_bps: u32 },
    /// `for` did not exceed `against`. Ties land here.
    NoMajority,
    /// The community has no stake at all.
    NoStake,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TallyDecision {
    Passed,
    Rejected(RejectionReason),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub for_weight: u128,
    pub against_weight: u128,
    pub abstain_weight: u128,
    pub total_stake: u128,
    /// Participation rounded down to basis points.
    pub participation_bps: u32,
    pub quorum_bps: u32,
    pub quorum_met: bool,
    pub votes_counted: usize,
    pub decision: TallyDecision,
}

impl TallyResult {
    pub fn passed(&self) -> bool {
        self.decision == TallyDecision::Passed
    }

    pub fn participating(&self) -> u128 {
        self.for_weight + self.against_weight + self.abstain_weight
    }
}

/// `floor(amount × bps / 10_000)` and whether it had a remainder.
fn scale_bps(amount: u128, bps: u32) -> (u128, bool) {
    let bps = u128::from(bps.min(BPS_DENOMINATOR));
    let denom = u128::from(BPS_DENOMINATOR);
    let rem = (amount % denom) * bps;
    ((amount / denom) * bps + rem / denom, rem % denom != 0)
}

/// Exact `participating × 10_000 ≥ quorum_bps × total`.
fn meets_quorum(participating: u128, total: u128, quorum_bps: u32) -> bool {
    let (floor, inexact) = scale_bps(total, quorum_bps);
    let needed = floor + u128::from(inexact);
    participating >= needed
}

fn participation_bps(participating: u128, total: u128) -> u32 {
    if total == 0 {
        return 0;
    }
    let denom = u128::from(BPS_DENOMINATOR);
    let bps = match participating.checked_mul(denom) {
        Some(scaled) => scaled / total,
        None => participating / (total / denom).max(1),
    };
    bps.min(denom) as u32
}

/// Tally `votes` against `stake`. Pure: no locks, no clock, no I/O.
///
/// Each voter counts once, with their stake in the snapshot. Voters missing
/// from the snapshot weigh nothing.
pub fn compute_tally<'a>(
    votes: impl IntoIterator<Item = &'a Vote>,
    stake: &StakeSnapshot,
    quorum_bps: u32,
) -> TallyResult {
    let mut latest: BTreeMap<&Identity, &Vote> = BTreeMap::new();
    for vote in votes {
        match latest.get(&vote.voter) {
            Some(existing) if existing.sequence > vote.sequence => {}
            _ => {
                latest.insert(&vote.voter, vote);
            }
        }
    }

    let (mut for_w, mut against_w, mut abstain_w) = (0u128, 0u128, 0u128);
    for vote in latest.values() {
        let weight = stake.stake_of(&vote.voter);
        let slot = match vote.option {
            VoteOption::For => &mut for_w,
            VoteOption::Against => &mut against_w,
            VoteOption::Abstain => &mut abstain_w,
        };
        *slot = slot.saturating_add(weight);
    }

    let total = stake.total_stake();
    let participating = for_w.saturating_add(against_w).saturating_add(abstain_w);
    let quorum_met = total > 0 && meets_quorum(participating, total, quorum_bps);
    let participation = participation_bps(participating, total);

    let decision = if total == 0 {
        TallyDecision::Rejected(RejectionReason::NoStake)
    } else if !quorum_met {
        TallyDecision::Rejected(RejectionReason::QuorumNotMet {
            participation_bps: participation,
            required_bps: quorum_bps,
        })
    } else if for_w > against_w {
        TallyDecision::Passed
    } else {
        TallyDecision::Rejected(RejectionReason::NoMajority)
    };

    TallyResult {
        for_weight: for_w,
        against_weight: against_w,
        abstain_weight: abstain_w,
        total_stake: total,
        participation_bps: participation,
        quorum_bps,
        quorum_met,
        votes_counted: latest.len(),
        decision,
    }
}

#[derive(Default)]
struct VoteLedger {
    votes: BTreeMap<Identity, Vote>,
    next_sequence: u64,
    snapshot: RunningSnapshot,
}

impl VoteLedger {
    fn restore(votes: Vec<Vote>) -> Self {
        let mut ledger = Self::default();
        for vote in votes {
            ledger.next_sequence = ledger.next_sequence.max(vote.sequence + 1);
            ledger.upsert(vote);
        }
        ledger
    }

    fn upsert(&mut self, vote: Vote) -> Option<VoteOption> {
        let option = vote.option;
        let replaced = match self.votes.get(&vote.voter) {
            Some(existing) if existing.sequence > vote.sequence => return None,
            Some(existing) => Some(existing.option),
            None => None,
        };
        if let Some(old) = replaced {
            self.snapshot.remove(old);
        }
        self.snapshot.add(option);
        self.votes.insert(vote.voter.clone(), vote);
        replaced
    }
}

pub struct VotingEngine {
    params: Arc<GovernanceParams>,
    stake: Arc<StakeholderRegistry>,
    verifier: Arc<dyn SignatureVerifier>,
    store: Arc<dyn VoteStore>,
    events: Arc<EventBus>,
    ledgers: RwLock<HashMap<ProposalId, Arc<Mutex<VoteLedger>>>>,
}

impl VotingEngine {
    pub fn new(
        params: Arc<GovernanceParams>,
        stake: Arc<StakeholderRegistry>,
        verifier: Arc<dyn SignatureVerifier>,
        store: Arc<dyn VoteStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            params,
            stake,
            verifier,
            store,
            events,
            ledgers: RwLock::new(HashMap::new()),
        }
    }

    /// The ledger for `id`, loaded from the vote store on first use.
    fn ledger(&self, id: &ProposalId) -> Result<Arc<Mutex<VoteLedger>>, GovernanceError> {
        if let Some(l) = self
            .ledgers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Ok(Arc::clone(l));
        }

        let mut stored = Vec::new();
        for bytes in self.store.get_votes(id)? {
            stored.push(
                bincode::deserialize::<Vote>(&bytes)
                    .map_err(|e| GovernanceError::Serialization(e.to_string()))?,
            );
        }
        let mut map = self.ledgers.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(map.entry(*id).or_insert_with(|| {
            Arc::new(Mutex::new(VoteLedger::restore(stored)))
        })))
    }

    /// Record a vote, replacing any earlier vote by the same voter.
    ///
    /// Holds the proposal's lock for the whole call, so the vote cannot race
    /// the tally or a withdrawal.
    pub fn submit_vote(
        &self,
        registry: &ProposalRegistry,
        request: VoteRequest,
        now: Timestamp,
    ) -> Result<VoteAck, GovernanceError> {
        let entry = registry.entry(&request.proposal_id)?;
        let proposal = entry.lock().unwrap_or_else(PoisonError::into_inner);

        if proposal.state != ProposalState::Voting {
            return Err(GovernanceError::VotingClosed(format!(
                "proposal is {}",
                proposal.state
            )));
        }
        if !proposal.periods.voting.contains(now) {
            return Err(GovernanceError::VotingClosed(format!(
                "{now} is outside the voting period"
            )));
        }
        if !proposal.can_vote(&request.voter) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not an eligible stakeholder",
                request.voter
            )));
        }
        let payload = vote_payload(&request.proposal_id, request.option, request.nonce);
        if !self
            .verifier
            .verify(&request.voter, &payload, &request.signature)
        {
            return Err(GovernanceError::Unauthorized(format!(
                "bad signature from {}",
                request.voter
            )));
        }

        let handle = self.ledger(&request.proposal_id)?;
        let mut ledger = handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = ledger.votes.get(&request.voter) {
            if request.nonce <= current.nonce {
                return Err(GovernanceError::Unauthorized(format!(
                    "stale nonce {} from {}, current vote has {}",
                    request.nonce, request.voter, current.nonce
                )));
            }
        }
        let vote = Vote {
            proposal_id: request.proposal_id,
            voter: request.voter.clone(),
            option: request.option,
            signature: request.signature,
            cast_at: now,
            sequence: ledger.next_sequence,
            nonce: request.nonce,
        };
        let bytes =
            bincode::serialize(&vote).map_err(|e| GovernanceError::Serialization(e.to_string()))?;
        self.store
            .put_vote(&request.proposal_id, &request.voter, &bytes)?;

        ledger.next_sequence += 1;
        let sequence = vote.sequence;
        let replaced = ledger.upsert(vote);
        let snapshot = ledger.snapshot;
        drop(ledger);

        tracing::debug!(
            proposal = %request.proposal_id,
            voter = %request.voter,
            option = ?request.option,
            replaced = ?replaced,
            "vote recorded"
        );
        self.events.emit(&GovernanceEvent::VoteCast {
            id: request.proposal_id,
            voter: request.voter.clone(),
            option: request.option,
            replaced,
            at: now,
        });
        drop(proposal);

        Ok(VoteAck {
            proposal_id: request.proposal_id,
            voter: request.voter,
            option: request.option,
            sequence,
            replaced,
            snapshot,
        })
    }

    /// Tally a proposal against the current stake snapshot of its community.
    pub fn tally(&self, proposal: &Proposal) -> Result<TallyResult, GovernanceError> {
        let handle = self.ledger(&proposal.id)?;
        let ledger = handle.lock().unwrap_or_else(PoisonError::into_inner);
        let stake = self.stake.snapshot(&proposal.community);
        let quorum_bps = self.params.quorum_bps(proposal.kind);
        Ok(compute_tally(ledger.votes.values(), &stake, quorum_bps))
    }

    pub fn running_snapshot(&self, id: &ProposalId) -> Result<RunningSnapshot, GovernanceError> {
        let handle = self.ledger(id)?;
        let snapshot = handle.lock().unwrap_or_else(PoisonError::into_inner).snapshot;
        Ok(snapshot)
    }

    /// Active votes in voter order.
    pub fn votes(&self, id: &ProposalId) -> Result<Vec<Vote>, GovernanceError> {
        let handle = self.ledger(id)?;
        let votes = handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .votes
            .values()
            .cloned()
            .collect();
        Ok(votes)
    }

    pub fn vote_of(&self, id: &ProposalId, voter: &Identity) -> Result<Option<Vote>, GovernanceError> {
        let handle = self.ledger(id)?;
        let vote = handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .votes
            .get(voter)
            .cloned();
        Ok(vote)
    }
}
