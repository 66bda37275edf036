use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("governance error: {0}")]
    Governance(#[from] concord_governance::GovernanceError),

    #[error("execution error: {0}")]
    Execution(#[from] concord_execution::ExecutionError),

    #[error("tokenomics error: {0}")]
    Tokenomics(#[from] concord_tokenomics::TokenomicsError),

    #[error("stake error: {0}")]
    Stake(#[from] concord_stake::StakeError),

    #[error("store error: {0}")]
    Store(#[from] concord_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] concord_store_lmdb::LmdbError),

    #[error("deployment error: {0}")]
    Deployment(#[from] concord_execution::DeploymentError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("logging already initialised: {0}")]
    Logging(String),
}
