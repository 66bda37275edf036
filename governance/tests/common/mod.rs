#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use concord_governance::{
    AdvanceContext, EventBus, ExecutionOutcome, ExecutionPlan, GovernanceError, Phase, PhaseId,
    Proposal, ProposalRegistry, ProposalRequest, SignatureVerifier, TallyResult, TimelineSpec,
    VoteOption, VoteRequest, VotingEngine,
};
use concord_stake::{Stakeholder, StakeholderRegistry};
use concord_store::{ProposalStore, StoreError, VoteStore};
use concord_types::{
    CommunityId, GovernanceParams, Identity, ProposalId, ProposalKind, ProposalState,
    QuorumThresholds, Timestamp,
};

pub const DAY: u64 = 86_400;
pub const T0: u64 = 1_000_000;

#[derive(Default)]
pub struct MemStore {
    proposals: Mutex<HashMap<ProposalId, (ProposalState, Vec<u8>)>>,
    votes: Mutex<BTreeMap<(ProposalId, Identity), Vec<u8>>>,
    fail_proposal_writes: AtomicBool,
}

impl MemStore {
    pub fn fail_proposal_writes(&self, fail: bool) {
        self.fail_proposal_writes.store(fail, Ordering::SeqCst);
    }
}

impl ProposalStore for MemStore {
    fn put_proposal(&self, id: &ProposalId, state: ProposalState, data: &[u8]) -> Result<(), StoreError> {
        if self.fail_proposal_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.proposals.lock().unwrap().insert(*id, (state, data.to_vec()));
        Ok(())
    }
    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.proposals.lock().unwrap().get(id).map(|(_, d)| d.clone()))
    }
    fn list_by_state(&self, state: ProposalState) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self
            .proposals
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, (s, _))| *s == state)
            .map(|(id, _)| *id)
            .collect())
    }
    fn list_proposals(&self) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self.proposals.lock().unwrap().keys().copied().collect())
    }
}

impl VoteStore for MemStore {
    fn put_vote(&self, proposal: &ProposalId, voter: &Identity, data: &[u8]) -> Result<(), StoreError> {
        self.votes
            .lock()
            .unwrap()
            .insert((*proposal, voter.clone()), data.to_vec());
        Ok(())
    }
    fn get_vote(&self, proposal: &ProposalId, voter: &Identity) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.votes.lock().unwrap().get(&(*proposal, voter.clone())).cloned())
    }
    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|((p, _), _)| p == proposal)
            .map(|(_, v)| v.clone())
            .collect())
    }
}

/// Accepts any non-empty signature.
pub struct AnySignature;

impl SignatureVerifier for AnySignature {
    fn verify(&self, _voter: &Identity, _payload: &[u8], signature: &[u8]) -> bool {
        !signature.is_empty()
    }
}

pub struct Ctx<'a> {
    pub voting: &'a VotingEngine,
    pub outcomes: HashMap<ProposalId, ExecutionOutcome>,
    pub fail_tally: bool,
}

impl AdvanceContext for Ctx<'_> {
    fn tally(&self, proposal: &Proposal) -> Result<TallyResult, GovernanceError> {
        if self.fail_tally {
            return Err(GovernanceError::Tally("stake snapshot unavailable".into()));
        }
        self.voting.tally(proposal)
    }
    fn execution_outcome(&self, id: &ProposalId) -> Option<ExecutionOutcome> {
        self.outcomes.get(id).cloned()
    }
}

pub struct World {
    pub store: Arc<MemStore>,
    pub stake: Arc<StakeholderRegistry>,
    pub events: Arc<EventBus>,
    pub params: Arc<GovernanceParams>,
    pub registry: ProposalRegistry,
    pub voting: VotingEngine,
}

pub fn community() -> CommunityId {
    CommunityId::from("alpha")
}

pub fn id(name: &str) -> Identity {
    Identity::from(name)
}

impl World {
    /// alice 3000, bob 1000, carol 500, dave 5500: total 10,000. Quorum 40%.
    pub fn new() -> Self {
        let params = Arc::new(GovernanceParams {
            quorum: QuorumThresholds::uniform(4000),
            ..GovernanceParams::default()
        });
        let stake = Arc::new(StakeholderRegistry::new());
        stake
            .apply_snapshot(
                &community(),
                vec![
                    Stakeholder::new(id("alice"), 3000, 0.9, Timestamp::EPOCH),
                    Stakeholder::new(id("bob"), 1000, 0.7, Timestamp::EPOCH),
                    Stakeholder::new(id("carol"), 500, 0.5, Timestamp::EPOCH),
                    Stakeholder::new(id("dave"), 5500, 0.5, Timestamp::EPOCH),
                ],
                Timestamp::EPOCH,
            )
            .unwrap();
        let store = Arc::new(MemStore::default());
        let events = Arc::new(EventBus::new());
        let registry = ProposalRegistry::new(
            Arc::clone(&params),
            Arc::clone(&stake),
            store.clone(),
            Arc::clone(&events),
        );
        let voting = VotingEngine::new(
            Arc::clone(&params),
            Arc::clone(&stake),
            Arc::new(AnySignature),
            store.clone(),
            Arc::clone(&events),
        );
        Self {
            store,
            stake,
            events,
            params,
            registry,
            voting,
        }
    }

    pub fn ctx(&self) -> Ctx<'_> {
        Ctx {
            voting: &self.voting,
            outcomes: HashMap::new(),
            fail_tally: false,
        }
    }

    pub fn vote(&self, proposal: ProposalId, voter: &str, option: VoteOption, at: u64) -> Result<concord_governance::VoteAck, GovernanceError> {
        self.voting.submit_vote(
            &self.registry,
            VoteRequest {
                proposal_id: proposal,
                voter: id(voter),
                option,
                signature: vec![1],
                nonce: at,
            },
            Timestamp::new(at),
        )
    }
}

pub fn phase(name: &str, deps: &[&str]) -> Phase {
    Phase {
        id: PhaseId::from(name),
        name: format!("phase {name}"),
        objectives: vec![format!("deliver {name}")],
        deliverables: vec![format!("{name} report")],
        estimated_duration_days: 3,
        responsible_agents: [id("agent")].into_iter().collect(),
        completion_criteria: vec!["reviewed".into()],
        dependencies: deps.iter().map(|d| PhaseId::from(*d)).collect(),
    }
}

pub fn request() -> ProposalRequest {
    ProposalRequest {
        title: Some("Fund the community garden".into()),
        description: Some("Soil, seeds and a shed".into()),
        kind: Some(ProposalKind::Operational),
        proposer: Some(id("alice")),
        community: Some(community()),
        execution_plan: Some(ExecutionPlan::new(vec![phase("a", &[]), phase("b", &["a"])])),
        timeline: Some(TimelineSpec {
            review_period_days: 1,
            voting_period_days: 1,
            key_milestones: Vec::new(),
        }),
        stakeholders: Some(
            ["alice", "bob", "carol", "dave"].into_iter().map(id).collect(),
        ),
        open_membership: false,
        draft: false,
        budget_request: Some(500),
    }
}

/// Voting opens at T0 + DAY and closes at T0 + 2 DAY.
pub const VOTING_OPEN: u64 = T0 + DAY;
pub const VOTING_CLOSE: u64 = T0 + 2 * DAY;
