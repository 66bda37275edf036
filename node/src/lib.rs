//! Concord governance node.
//!
//! The node owns one instance of every component and drives them:
//! - builds storage (in-memory or LMDB) and loads persisted proposals
//! - refreshes stake snapshots from the staking ledger
//! - sweeps on a fixed interval, advancing due proposals on a per-proposal
//!   worker pool, ticking execution runs and flushing sponsorship batches
//! - dispatches passed budgets to the deployment target
//! - exposes Prometheus metrics and structured logs

pub mod config;
pub mod deployment;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod pool;
pub mod shutdown;

pub use config::{NodeConfig, StorageBackend};
pub use deployment::{DeploymentDispatcher, DispatchOutcome};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::GovernanceMetrics;
pub use node::{Collaborators, GovernanceNode, NodeStatus, SweepReport};
pub use pool::ProposalWorkPool;
pub use shutdown::{ShutdownController, ShutdownSignal};
