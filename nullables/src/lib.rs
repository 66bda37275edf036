//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the governance core sits behind a trait.
//! This crate provides implementations of those traits that return
//! deterministic values, can be steered from a test, and never touch the
//! filesystem or network. `NullStore` doubles as the node's in-memory
//! storage backend.

pub mod clock;
pub mod deployment;
pub mod ledger;
pub mod relay;
pub mod store;
pub mod verifier;

pub use clock::NullClock;
pub use deployment::NullDeployment;
pub use ledger::NullStakingLedger;
pub use relay::NullRelay;
pub use store::NullStore;
pub use verifier::NullVerifier;
