//! Fundamental types for the Concord governance core.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identities, community and proposal ids, timestamps, proposal kinds and
//! lifecycle states, and the governance parameters.

pub mod address;
pub mod error;
pub mod hash;
pub mod kind;
pub mod params;
pub mod state;
pub mod time;

pub use address::{CommunityId, Identity};
pub use error::TypeError;
pub use hash::ProposalId;
pub use kind::ProposalKind;
pub use params::{GovernanceParams, QuorumThresholds, BPS_DENOMINATOR};
pub use state::ProposalState;
pub use time::Timestamp;
