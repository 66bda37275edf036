//! Stakeholder registry.
//!
//! Holds a periodically refreshed, read-only view of stake and reputation per
//! community. The true balances live with an external staking ledger; this
//! crate only ever replaces whole snapshots pulled from it.

pub mod error;
pub mod ledger;
pub mod registry;
pub mod stakeholder;

pub use error::StakeError;
pub use ledger::StakingLedger;
pub use registry::{StakeSnapshot, StakeholderRegistry};
pub use stakeholder::Stakeholder;
