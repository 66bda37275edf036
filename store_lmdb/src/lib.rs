//! LMDB storage backend for the Concord governance core.
//!
//! Implements all storage traits from `concord-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment.

pub mod environment;
pub mod error;
pub mod governance;
pub mod integrity;
pub mod treasury;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::{LmdbProposalStore, LmdbVoteStore};
pub use treasury::LmdbTreasuryStore;
