//! Execution of passed proposals.
//!
//! [`ExecutionEngine`] drives each proposal's phases in dependency order from
//! external milestone signals and a periodic tick. [`InterCommunityCoordinator`]
//! groups proposals from several communities into one project and reports an
//! aggregate status computed on demand.

pub mod config;
pub mod coordinator;
pub mod deployment;
pub mod engine;
pub mod error;

pub use config::ExecutionConfig;
pub use coordinator::{
    CrossCommunityProject, InterCommunityCoordinator, MemberStatus, ProjectId, ProjectMember,
    ProjectProgress, ProjectTimeline,
};
pub use deployment::{DeploymentError, DeploymentTarget};
pub use engine::{
    DeliverableReport, DeliverableStatus, ExecutionEngine, ExecutionRun, MilestoneSignal,
    MilestoneStatus, PhaseProgress, RunStatus, SignalOutcome, TickReport,
};
pub use error::ExecutionError;
