//! Proposal lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a proposal.
///
/// ```text
/// Draft → UnderReview → Voting → {Passed, Rejected}
/// Passed → Executing → {Completed, Failed}
/// {Draft, UnderReview, Voting} → Withdrawn
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created with the draft flag; waits for the proposer to submit it.
    Draft,
    /// Review period running; no votes accepted yet.
    UnderReview,
    /// Voting period running.
    Voting,
    /// Tallied and passed.
    Passed,
    /// Tallied and rejected (quorum not met, not a majority, or a tie).
    Rejected,
    /// Execution plan is being carried out.
    Executing,
    /// All execution phases completed.
    Completed,
    /// Execution failed; a new proposal is required.
    Failed,
    /// Cancelled by the proposer before a tally.
    Withdrawn,
}

impl ProposalState {
    pub const ALL: [ProposalState; 9] = [
        Self::Draft,
        Self::UnderReview,
        Self::Voting,
        Self::Passed,
        Self::Rejected,
        Self::Executing,
        Self::Completed,
        Self::Failed,
        Self::Withdrawn,
    ];

    /// Whether `self → next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: ProposalState) -> bool {
        use ProposalState::*;
        matches!(
            (self, next),
            (Draft, UnderReview)
                | (UnderReview, Voting)
                | (Voting, Passed)
                | (Voting, Rejected)
                | (Passed, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Draft, Withdrawn)
                | (UnderReview, Withdrawn)
                | (Voting, Withdrawn)
        )
    }

    /// Whether a tally has already been recorded for a proposal in this state.
    pub fn has_tally(&self) -> bool {
        matches!(
            self,
            Self::Passed | Self::Rejected | Self::Executing | Self::Completed | Self::Failed
        )
    }

    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Completed | Self::Failed | Self::Withdrawn
        )
    }

    /// Whether the proposer may still withdraw the proposal.
    pub fn is_withdrawable(&self) -> bool {
        self.can_transition_to(Self::Withdrawn)
    }

    /// Stable lowercase name, used as the store's state index key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::UnderReview => "under_review",
            Self::Voting => "voting",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
