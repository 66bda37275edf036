//! Proposal registry: the lifecycle state machine.
//!
//! Each proposal sits behind its own mutex. Every mutation works on a copy,
//! persists it, and only then replaces the in-memory record, so a failed
//! write never leaves a half-applied change behind.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use concord_stake::StakeholderRegistry;
use concord_store::ProposalStore;
use concord_types::{
    CommunityId, GovernanceParams, Identity, ProposalId, ProposalKind, ProposalState, Timestamp,
};

use crate::events::{EventBus, GovernanceEvent};
use crate::proposal::{Proposal, ProposalRequest, Transition};
use crate::timeline::TimelineScheduler;
use crate::voting::{TallyDecision, TallyResult};
use crate::GovernanceError;

/// What the registry needs from the rest of the system to advance a proposal.
pub trait AdvanceContext {
    /// Tally a proposal whose voting period has closed.
    fn tally(&self, proposal: &Proposal) -> Result<TallyResult, GovernanceError>;

    /// Final outcome of an execution run, once there is one.
    fn execution_outcome(&self, id: &ProposalId) -> Option<ExecutionOutcome>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    Failed(String),
}

/// Transitions applied by one `advance` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdvanceOutcome {
    pub transitions: Vec<Transition>,
    pub tally: Option<TallyResult>,
}

impl AdvanceOutcome {
    pub fn is_noop(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn final_state(&self) -> Option<ProposalState> {
        self.transitions.last().map(|t| t.to)
    }
}

/// Filter for [`ProposalRegistry::query`]. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct ProposalFilter {
    pub state: Option<ProposalState>,
    pub kind: Option<ProposalKind>,
    pub proposer: Option<Identity>,
    pub community: Option<CommunityId>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ProposalFilter {
    fn matches(&self, p: &Proposal) -> bool {
        self.state.map_or(true, |s| p.state == s)
            && self.kind.map_or(true, |k| p.kind == k)
            && self.proposer.as_ref().map_or(true, |i| &p.proposer == i)
            && self.community.as_ref().map_or(true, |c| &p.community == c)
    }
}

#[derive(Clone, Debug)]
pub struct ProposalPage {
    /// Newest first.
    pub items: Vec<Proposal>,
    /// Matches before pagination.
    pub total: usize,
}

pub struct ProposalRegistry {
    params: Arc<GovernanceParams>,
    stake: Arc<StakeholderRegistry>,
    store: Arc<dyn ProposalStore>,
    events: Arc<EventBus>,
    proposals: RwLock<HashMap<ProposalId, Arc<Mutex<Proposal>>>>,
    nonce: AtomicU64,
}

fn lock(entry: &Mutex<Proposal>) -> MutexGuard<'_, Proposal> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, GovernanceError> {
    value.ok_or_else(|| GovernanceError::Validation(format!("{field} is required")))
}

fn required_text(value: Option<String>, field: &str) -> Result<String, GovernanceError> {
    let text = required(value, field)?;
    if text.trim().is_empty() {
        return Err(GovernanceError::Validation(format!("{field} is empty")));
    }
    Ok(text)
}

impl ProposalRegistry {
    pub fn new(
        params: Arc<GovernanceParams>,
        stake: Arc<StakeholderRegistry>,
        store: Arc<dyn ProposalStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            params,
            stake,
            store,
            events,
            proposals: RwLock::new(HashMap::new()),
            nonce: AtomicU64::new(0),
        }
    }

    /// Rebuild the registry from everything in `store`.
    pub fn load(
        params: Arc<GovernanceParams>,
        stake: Arc<StakeholderRegistry>,
        store: Arc<dyn ProposalStore>,
        events: Arc<EventBus>,
    ) -> Result<Self, GovernanceError> {
        let registry = Self::new(params, stake, store, events);
        let ids = registry.store.list_proposals()?;
        let mut map = HashMap::with_capacity(ids.len());
        for id in ids {
            let Some(bytes) = registry.store.get_proposal(&id)? else {
                continue;
            };
            let proposal = Proposal::decode(&bytes)?;
            map.insert(id, Arc::new(Mutex::new(proposal)));
        }
        registry.nonce.store(map.len() as u64, Ordering::SeqCst);
        tracing::info!(proposals = map.len(), "proposal registry loaded");
        *registry
            .proposals
            .write()
            .unwrap_or_else(PoisonError::into_inner) = map;
        Ok(registry)
    }

    pub(crate) fn entry(&self, id: &ProposalId) -> Result<Arc<Mutex<Proposal>>, GovernanceError> {
        self.proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or(GovernanceError::ProposalNotFound(*id))
    }

    fn persist(&self, proposal: &Proposal) -> Result<(), GovernanceError> {
        self.store
            .put_proposal(&proposal.id, proposal.state, &proposal.encode()?)?;
        Ok(())
    }

    fn emit_transitions(&self, id: ProposalId, transitions: &[Transition]) {
        for t in transitions {
            tracing::info!(proposal = %id, from = %t.from, to = %t.to, "proposal state changed");
            self.events.emit(&GovernanceEvent::StateChanged {
                id,
                from: t.from,
                to: t.to,
                at: t.at,
            });
        }
    }

    pub fn create_proposal(
        &self,
        request: ProposalRequest,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let title = required_text(request.title, "title")?;
        let description = required_text(request.description, "description")?;
        let kind = required(request.kind, "kind")?;
        let proposer = required(request.proposer, "proposer")?;
        if !proposer.is_valid() {
            return Err(GovernanceError::Validation("proposer is malformed".into()));
        }
        let community = required(request.community, "community")?;
        if !community.is_valid() {
            return Err(GovernanceError::Validation("community is malformed".into()));
        }
        let plan = required(request.execution_plan, "execution plan")?;
        plan.validate(self.params.max_plan_phases)?;
        let timeline = required(request.timeline, "timeline")?;
        let stakeholders: BTreeSet<Identity> = required(request.stakeholders, "stakeholders")?;
        if stakeholders.is_empty() {
            return Err(GovernanceError::Validation("stakeholders is empty".into()));
        }
        if let Some(bad) = stakeholders.iter().find(|s| !s.is_valid()) {
            return Err(GovernanceError::Validation(format!(
                "stakeholder {bad:?} is malformed"
            )));
        }

        let min_stake = u128::from(self.params.min_proposer_stake);
        if min_stake > 0 {
            let have = self.stake.stake_of(&community, &proposer);
            if have < min_stake {
                return Err(GovernanceError::Unauthorized(format!(
                    "{proposer} holds {have} stake in {community}, {min_stake} required"
                )));
            }
        }

        let mut map = self
            .proposals
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = loop {
            let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
            let id = ProposalId::derive(&proposer, &title, now, nonce);
            if !map.contains_key(&id) {
                break id;
            }
        };

        let periods =
            TimelineScheduler::schedule(id, now, &timeline, self.params.max_period_days)?;
        let state = if request.draft {
            ProposalState::Draft
        } else {
            ProposalState::UnderReview
        };
        let proposal = Proposal {
            id,
            title,
            description,
            kind,
            proposer,
            community,
            stakeholders,
            open_membership: request.open_membership,
            plan,
            timeline,
            periods,
            state,
            created_at: now,
            submitted_at: (!request.draft).then_some(now),
            tally: None,
            budget_request: request.budget_request,
            failure_reason: None,
            history: Vec::new(),
        };

        self.persist(&proposal)?;
        map.insert(id, Arc::new(Mutex::new(proposal.clone())));
        drop(map);

        tracing::info!(proposal = %id, kind = %kind, proposer = %proposal.proposer, state = %state, "proposal created");
        self.events.emit(&GovernanceEvent::ProposalCreated {
            id,
            kind,
            proposer: proposal.proposer.clone(),
            state,
            at: now,
        });
        Ok(proposal)
    }

    /// Move a draft into review. Periods are re-anchored at `now`.
    pub fn submit(
        &self,
        id: &ProposalId,
        requester: &Identity,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        if &guard.proposer != requester {
            return Err(GovernanceError::Unauthorized(format!(
                "only the proposer may submit {id}"
            )));
        }
        if guard.state != ProposalState::Draft {
            return Err(GovernanceError::InvalidState {
                state: guard.state,
                action: "submit",
            });
        }

        let mut working = guard.clone();
        working.periods =
            TimelineScheduler::schedule(*id, now, &working.timeline, self.params.max_period_days)?;
        working.submitted_at = Some(now);
        let t = working.transition(ProposalState::UnderReview, now, "submit")?;
        self.persist(&working)?;
        *guard = working.clone();
        self.emit_transitions(*id, &[t]);
        Ok(working)
    }

    /// Apply every transition whose time has come.
    ///
    /// Idempotent: a second call at the same `now` does nothing. A tally
    /// error leaves the proposal in `Voting` (after keeping any earlier step
    /// from this call) and is returned so the caller can retry later.
    pub fn advance(
        &self,
        id: &ProposalId,
        now: Timestamp,
        ctx: &dyn AdvanceContext,
    ) -> Result<AdvanceOutcome, GovernanceError> {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        let mut working = guard.clone();
        let mut outcome = AdvanceOutcome::default();

        let failure = loop {
            let step = match working.state {
                ProposalState::UnderReview if working.periods.review.has_closed(now) => {
                    working.transition(ProposalState::Voting, now, "open voting on")
                }
                ProposalState::Voting if working.periods.voting.has_closed(now) => {
                    match ctx.tally(&working) {
                        Ok(tally) => {
                            let next = match tally.decision {
                                TallyDecision::Passed => ProposalState::Passed,
                                TallyDecision::Rejected(_) => ProposalState::Rejected,
                            };
                            working.tally = Some(tally.clone());
                            outcome.tally = Some(tally);
                            working.transition(next, now, "tally")
                        }
                        Err(e) => break Some(e),
                    }
                }
                ProposalState::Passed => {
                    working.transition(ProposalState::Executing, now, "execute")
                }
                ProposalState::Executing => match ctx.execution_outcome(id) {
                    Some(ExecutionOutcome::Completed) => {
                        working.transition(ProposalState::Completed, now, "complete")
                    }
                    Some(ExecutionOutcome::Failed(reason)) => {
                        working.failure_reason = Some(reason);
                        working.transition(ProposalState::Failed, now, "fail")
                    }
                    None => break None,
                },
                _ => break None,
            };
            match step {
                Ok(t) => outcome.transitions.push(t),
                Err(e) => break Some(e),
            }
        };

        if !outcome.transitions.is_empty() {
            self.persist(&working)?;
            *guard = working;
            for t in &outcome.transitions {
                if let (ProposalState::Voting, Some(tally)) = (t.from, &outcome.tally) {
                    self.events.emit(&GovernanceEvent::Tallied {
                        id: *id,
                        passed: tally.passed(),
                        participation_bps: tally.participation_bps,
                        at: t.at,
                    });
                }
                self.emit_transitions(*id, std::slice::from_ref(t));
            }
        }
        drop(guard);

        match failure {
            Some(e) => {
                tracing::warn!(proposal = %id, error = %e, "advance stopped early");
                Err(e)
            }
            None => Ok(outcome),
        }
    }

    /// Cancel a proposal before it is tallied. Proposer only.
    pub fn withdraw(
        &self,
        id: &ProposalId,
        requester: &Identity,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        if &guard.proposer != requester {
            return Err(GovernanceError::Unauthorized(format!(
                "only the proposer may withdraw {id}"
            )));
        }
        if guard.state.has_tally() || !guard.state.is_withdrawable() {
            return Err(GovernanceError::InvalidState {
                state: guard.state,
                action: "withdraw",
            });
        }
        let mut working = guard.clone();
        let t = working.transition(ProposalState::Withdrawn, now, "withdraw")?;
        self.persist(&working)?;
        *guard = working.clone();
        self.emit_transitions(*id, &[t]);
        Ok(working)
    }

    pub fn get(&self, id: &ProposalId) -> Result<Proposal, GovernanceError> {
        let entry = self.entry(id)?;
        let proposal = lock(&entry).clone();
        Ok(proposal)
    }

    /// Ids in `state`, read from the store's state index.
    pub fn list_by_state(&self, state: ProposalState) -> Result<Vec<ProposalId>, GovernanceError> {
        Ok(self.store.list_by_state(state)?)
    }

    /// Proposals the sweep should advance at `now`.
    pub fn due(&self, now: Timestamp) -> Vec<ProposalId> {
        let entries: Vec<_> = self
            .proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, e)| (*id, Arc::clone(e)))
            .collect();
        let mut due: Vec<_> = entries
            .into_iter()
            .filter(|(_, e)| {
                let p = lock(e);
                TimelineScheduler::is_due(p.state, &p.periods, now)
            })
            .map(|(id, _)| id)
            .collect();
        due.sort();
        due
    }

    /// Communities with at least one proposal that has not reached a
    /// terminal state.
    pub fn active_communities(&self) -> BTreeSet<CommunityId> {
        let entries: Vec<_> = self
            .proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries
            .iter()
            .filter_map(|e| {
                let p = lock(e);
                (!p.state.is_terminal()).then(|| p.community.clone())
            })
            .collect()
    }

    pub fn query(&self, filter: &ProposalFilter) -> ProposalPage {
        let entries: Vec<_> = self
            .proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut matched: Vec<Proposal> = entries
            .iter()
            .map(|e| lock(e).clone())
            .filter(|p| filter.matches(p))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        ProposalPage { items, total }
    }

    pub fn len(&self) -> usize {
        self.proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
