//! Timeline scheduling.
//!
//! Everything here is a pure function of the inputs and an explicit `now`.
//! The node's periodic sweep is what turns these answers into transitions.

use std::collections::HashMap;

use concord_types::{ProposalId, ProposalState, Timestamp};
use serde::{Deserialize, Serialize};

use crate::plan::{ExecutionPlan, PhaseId, PlanError};
use crate::GovernanceError;

/// A named checkpoint, in days from the start of execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMilestone {
    pub name: String,
    pub offset_days: u32,
}

/// Requested review and voting lengths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSpec {
    pub review_period_days: u32,
    pub voting_period_days: u32,
    #[serde(default)]
    pub key_milestones: Vec<KeyMilestone>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    Review,
    Voting,
}

/// A half-open window `[opens_at, closes_at)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePeriod {
    pub proposal_id: ProposalId,
    pub kind: PeriodKind,
    pub opens_at: Timestamp,
    pub closes_at: Timestamp,
}

impl TimelinePeriod {
    pub fn contains(&self, now: Timestamp) -> bool {
        self.opens_at <= now && now < self.closes_at
    }

    pub fn has_closed(&self, now: Timestamp) -> bool {
        now >= self.closes_at
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPeriods {
    pub review: TimelinePeriod,
    pub voting: TimelinePeriod,
}

/// Projected start and end of a phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectedPhase {
    pub phase: PhaseId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

pub struct TimelineScheduler;

impl TimelineScheduler {
    /// Review opens at `anchor`; voting opens the moment review closes.
    pub fn schedule(
        id: ProposalId,
        anchor: Timestamp,
        spec: &TimelineSpec,
        max_period_days: u32,
    ) -> Result<ProposalPeriods, GovernanceError> {
        for (name, days) in [
            ("review_period_days", spec.review_period_days),
            ("voting_period_days", spec.voting_period_days),
        ] {
            if days == 0 {
                return Err(GovernanceError::Validation(format!("{name} must be positive")));
            }
            if days > max_period_days {
                return Err(GovernanceError::Validation(format!(
                    "{name} is {days}, limit is {max_period_days}"
                )));
            }
        }

        let review_closes = anchor.plus_days(spec.review_period_days);
        let voting_closes = review_closes.plus_days(spec.voting_period_days);
        Ok(ProposalPeriods {
            review: TimelinePeriod {
                proposal_id: id,
                kind: PeriodKind::Review,
                opens_at: anchor,
                closes_at: review_closes,
            },
            voting: TimelinePeriod {
                proposal_id: id,
                kind: PeriodKind::Voting,
                opens_at: review_closes,
                closes_at: voting_closes,
            },
        })
    }

    /// The next time-based deadline for a proposal in `state`, if any.
    pub fn next_deadline(state: ProposalState, periods: &ProposalPeriods) -> Option<Timestamp> {
        match state {
            ProposalState::UnderReview => Some(periods.review.closes_at),
            ProposalState::Voting => Some(periods.voting.closes_at),
            _ => None,
        }
    }

    /// Whether the sweep should call `advance` for this proposal.
    ///
    /// `Passed` moves on immediately and `Executing` waits on execution
    /// reports, so both are always due.
    pub fn is_due(state: ProposalState, periods: &ProposalPeriods, now: Timestamp) -> bool {
        match state {
            ProposalState::Passed | ProposalState::Executing => true,
            _ => Self::next_deadline(state, periods).is_some_and(|d| now >= d),
        }
    }

    /// Earliest start of `phase`: the latest completion time among its
    /// dependencies, or `fallback` for a phase with none. `None` while any
    /// dependency is still incomplete.
    pub fn earliest_start(
        plan: &ExecutionPlan,
        phase: &PhaseId,
        completed: &HashMap<PhaseId, Timestamp>,
        fallback: Timestamp,
    ) -> Option<Timestamp> {
        let phase = plan.phase(phase)?;
        phase
            .dependencies
            .iter()
            .try_fold(fallback, |acc, dep| completed.get(dep).map(|&t| acc.max(t)))
    }

    pub fn topological_order(plan: &ExecutionPlan) -> Result<Vec<PhaseId>, PlanError> {
        plan.topological_order()
    }

    /// Start and end of every phase if each one takes exactly its estimate.
    pub fn projected_schedule(
        plan: &ExecutionPlan,
        start: Timestamp,
    ) -> Result<Vec<ProjectedPhase>, PlanError> {
        let order = plan.topological_order()?;
        let mut ends: HashMap<PhaseId, Timestamp> = HashMap::with_capacity(order.len());
        let mut out = Vec::with_capacity(order.len());
        for id in order {
            let Some(phase) = plan.phase(&id) else {
                continue;
            };
            let starts_at = phase
                .dependencies
                .iter()
                .filter_map(|d| ends.get(d).copied())
                .fold(start, Timestamp::max);
            let ends_at = starts_at.plus_days(phase.estimated_duration_days);
            ends.insert(id.clone(), ends_at);
            out.push(ProjectedPhase {
                phase: id,
                starts_at,
                ends_at,
            });
        }
        Ok(out)
    }
}
