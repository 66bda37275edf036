//! Proposal records and creation requests.

use std::collections::BTreeSet;

use concord_types::{CommunityId, Identity, ProposalId, ProposalKind, ProposalState, Timestamp};
use serde::{Deserialize, Serialize};

use crate::plan::ExecutionPlan;
use crate::timeline::{ProposalPeriods, TimelineSpec};
use crate::voting::TallyResult;
use crate::GovernanceError;

/// What a caller submits to create a proposal.
///
/// Required fields are optional here so that an incomplete request is a
/// `Validation` error rather than a deserialization failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ProposalKind>,
    pub proposer: Option<Identity>,
    pub community: Option<CommunityId>,
    pub execution_plan: Option<ExecutionPlan>,
    pub timeline: Option<TimelineSpec>,
    pub stakeholders: Option<BTreeSet<Identity>>,
    /// Any identity may vote, not just listed stakeholders.
    pub open_membership: bool,
    /// Create in `Draft`; the proposer submits it later.
    pub draft: bool,
    /// Amount handed to the deployment target once the proposal passes.
    pub budget_request: Option<u64>,
}

/// A recorded state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: ProposalState,
    pub to: ProposalState,
    pub at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub proposer: Identity,
    pub community: CommunityId,
    pub stakeholders: BTreeSet<Identity>,
    pub open_membership: bool,
    pub plan: ExecutionPlan,
    pub timeline: TimelineSpec,
    pub periods: ProposalPeriods,
    pub state: ProposalState,
    pub created_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub tally: Option<TallyResult>,
    pub budget_request: Option<u64>,
    pub failure_reason: Option<String>,
    pub history: Vec<Transition>,
}

impl Proposal {
    pub fn can_vote(&self, voter: &Identity) -> bool {
        self.open_membership || self.stakeholders.contains(voter)
    }

    /// Move to `next`, recording the change. Edges outside the lifecycle
    /// graph fail with `InvalidState`.
    pub(crate) fn transition(
        &mut self,
        next: ProposalState,
        at: Timestamp,
        action: &'static str,
    ) -> Result<Transition, GovernanceError> {
        if !self.state.can_transition_to(next) {
            return Err(GovernanceError::InvalidState {
                state: self.state,
                action,
            });
        }
        let t = Transition {
            from: self.state,
            to: next,
            at,
        };
        self.state = next;
        self.history.push(t.clone());
        Ok(t)
    }

    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        bincode::serialize(self).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GovernanceError> {
        bincode::deserialize(bytes).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }
}
