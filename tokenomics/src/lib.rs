//! Tokenomics for the Concord governance core.
//!
//! - [`config`]: fee structure, budgets, sponsorship rule, batching window
//! - [`treasury`]: per-community budget with accounting-period rollover
//! - [`engine`]: fee lookup, eligibility and budget debits
//! - [`batcher`]: gas-sponsored transaction queueing and all-or-nothing flushes

pub mod batcher;
pub mod config;
pub mod engine;
pub mod error;
pub mod treasury;

pub use batcher::{
    BatchOutcome, BatchReport, DenialReason, GaslessTransaction, GaslessTransactionBatcher,
    SponsorshipDecision, SponsorshipRelay, SponsorshipResponse, SponsorshipTicket,
};
pub use config::{
    BatchConfig, CommunityTokenomics, FeeStructure, SponsorshipRule, TokenomicsConfig, VolumeTier,
};
pub use engine::TokenomicsEngine;
pub use error::{RelayError, TokenomicsError};
pub use treasury::Treasury;
