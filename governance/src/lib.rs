//! Proposal lifecycle and voting.
//!
//! - [`registry`]: `Draft → UnderReview → Voting → {Passed, Rejected}`,
//!   `Passed → Executing → {Completed, Failed}`, and `Withdrawn` before a tally
//! - [`voting`]: one vote per voter, stake-weighted tallies with per-kind quorum
//! - [`timeline`]: review/voting windows and phase scheduling, all pure
//! - [`plan`]: execution plans and their dependency DAG
//!
//! Locks are taken proposal first, then vote ledger.

pub mod error;
pub mod events;
pub mod plan;
pub mod proposal;
pub mod registry;
pub mod signature;
pub mod timeline;
pub mod voting;

pub use error::GovernanceError;
pub use events::{AuditLog, EventBus, GovernanceEvent};
pub use plan::{ExecutionPlan, Phase, PhaseId, PlanError};
pub use proposal::{Proposal, ProposalRequest, Transition};
pub use registry::{
    AdvanceContext, AdvanceOutcome, ExecutionOutcome, ProposalFilter, ProposalPage,
    ProposalRegistry,
};
pub use signature::{vote_payload, Ed25519Verifier, SignatureVerifier};
pub use timeline::{
    KeyMilestone, PeriodKind, ProjectedPhase, ProposalPeriods, TimelinePeriod, TimelineScheduler,
    TimelineSpec,
};
pub use voting::{
    compute_tally, RejectionReason, RunningSnapshot, TallyDecision, TallyResult, Vote, VoteAck,
    VoteOption, VoteRequest, VotingEngine,
};
