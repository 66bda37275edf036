//! Abstract storage traits for the Concord governance core.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits. Records are
//! opaque byte blobs; the owning component chooses the encoding.

pub mod error;
pub mod governance;
pub mod treasury;

pub use error::StoreError;
pub use governance::{ProposalStore, VoteStore};
pub use treasury::TreasuryStore;
