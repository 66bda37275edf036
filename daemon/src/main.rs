//! Concord daemon: entry point for running a governance node.

mod stake_file;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use concord_governance::{Ed25519Verifier, ProposalFilter};
use concord_node::{Collaborators, GovernanceNode, LogFormat, NodeConfig, StorageBackend};
use concord_nullables::{NullDeployment, NullRelay, NullStakingLedger};
use concord_stake::StakingLedger;
use concord_types::{CommunityId, ProposalState};

use crate::stake_file::StakeFileLedger;

#[derive(Parser)]
#[command(name = "concord-daemon", about = "Concord community governance node")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "CONCORD_CONFIG")]
    config: Option<PathBuf>,

    /// Storage backend: "memory" or "lmdb".
    #[arg(long, env = "CONCORD_STORAGE", value_parser = parse_storage)]
    storage: Option<StorageBackend>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "CONCORD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seconds between sweeps.
    #[arg(long, env = "CONCORD_SWEEP_INTERVAL")]
    sweep_interval: Option<u64>,

    /// Proposals advanced concurrently during a sweep.
    #[arg(long, env = "CONCORD_WORKERS")]
    workers: Option<usize>,

    /// Communities to refresh stake for (comma-separated).
    #[arg(long, env = "CONCORD_COMMUNITIES", value_delimiter = ',')]
    communities: Vec<String>,

    /// TOML file listing stakeholders per community.
    #[arg(long, env = "CONCORD_STAKE_FILE")]
    stake_file: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CONCORD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CONCORD_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Record Prometheus metrics and log them on shutdown.
    #[arg(long, env = "CONCORD_ENABLE_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node until interrupted.
    Run,
    /// Print the effective configuration as TOML.
    DefaultConfig,
    /// Print proposal counts per state as JSON.
    Status,
    /// List stored proposals as JSON.
    Proposals {
        /// Only proposals in this state (e.g. "voting").
        #[arg(long)]
        state: Option<String>,
    },
}

fn parse_storage(s: &str) -> Result<StorageBackend, String> {
    match s.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "lmdb" => Ok(StorageBackend::Lmdb),
        other => Err(format!("unknown storage backend {other:?}")),
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse().map_err(|e: concord_node::NodeError| e.to_string())
}

fn parse_state(s: &str) -> anyhow::Result<ProposalState> {
    ProposalState::ALL
        .into_iter()
        .find(|state| state.as_str() == s)
        .ok_or_else(|| anyhow::anyhow!("unknown proposal state {s:?}"))
}

impl Cli {
    /// File config (or defaults) with flags and env vars applied on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
                NodeConfig::from_toml_str(&text)?
            }
            None => NodeConfig::default(),
        };
        if let Some(storage) = self.storage {
            config.storage = storage;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(secs) = self.sweep_interval {
            config.sweep_interval_secs = secs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if !self.communities.is_empty() {
            config.communities = self
                .communities
                .iter()
                .map(|c| CommunityId::new(c.as_str()))
                .collect();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config.enable_metrics |= self.metrics;
        config.validate()?;
        Ok(config)
    }

    fn collaborators(&self) -> Collaborators {
        let ledger: Arc<dyn StakingLedger> = match &self.stake_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "reading stake from file");
                Arc::new(StakeFileLedger::new(path))
            }
            None => {
                tracing::warn!("no stake file configured; every community has zero stake");
                Arc::new(NullStakingLedger::new())
            }
        };
        Collaborators {
            ledger,
            relay: Arc::new(NullRelay::new()),
            verifier: Arc::new(Ed25519Verifier),
            deployment: Arc::new(NullDeployment::new()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    match &cli.command {
        Command::DefaultConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Status => {
            let node = GovernanceNode::new(config, cli.collaborators())?;
            println!("{}", serde_json::to_string_pretty(&node.status())?);
        }
        Command::Proposals { state } => {
            let filter = ProposalFilter {
                state: state.as_deref().map(parse_state).transpose()?,
                ..ProposalFilter::default()
            };
            let node = GovernanceNode::new(config, cli.collaborators())?;
            let page = node.registry().query(&filter);
            let rows: Vec<_> = page
                .items
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id.to_hex(),
                        "title": p.title,
                        "kind": p.kind.as_str(),
                        "community": p.community.as_str(),
                        "state": p.state.as_str(),
                        "voting_closes_at": p.periods.voting.closes_at.as_secs(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Run => {
            concord_node::init_logging(config.log_format, &config.log_level)?;
            tracing::info!(
                storage = ?config.storage,
                data_dir = %config.data_dir.display(),
                sweep_interval_secs = config.sweep_interval_secs,
                communities = config.communities.len(),
                "starting Concord node"
            );
            tracing::warn!("no sponsorship relay or deployment target configured; using local recorders");

            let enable_metrics = config.enable_metrics;
            let node = Arc::new(GovernanceNode::new(config, cli.collaborators())?);
            node.start().await;

            if let Err(e) = node.shutdown_controller().wait_for_signal().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received, stopping node");
            node.stop().await;

            if enable_metrics {
                tracing::info!(metrics = %node.metrics().encode()?, "final metrics");
            }
            tracing::info!("Concord daemon exited cleanly");
        }
    }

    Ok(())
}
