//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use concord_execution::ExecutionConfig;
use concord_tokenomics::TokenomicsConfig;
use concord_types::{CommunityId, GovernanceParams};

use crate::logging::LogFormat;
use crate::NodeError;

/// Where proposals, votes and treasuries are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost on restart. Tests and dry runs.
    Memory,
    Lmdb,
}

/// Configuration for a Concord node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every component receives the
/// section it needs by `Arc` at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_map_size")]
    pub lmdb_map_size: usize,

    /// Seconds between sweeps of due proposals.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Upper bound on proposals advanced concurrently during a sweep.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Communities whose stake is refreshed on every sweep, in addition to
    /// any community that already has proposals.
    #[serde(default)]
    pub communities: Vec<CommunityId>,

    /// Deployment attempts per proposal before the dispatcher gives up.
    #[serde(default = "default_deploy_attempts")]
    pub max_deploy_attempts: u32,

    /// Number of governance events kept in the in-memory audit log.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub governance: GovernanceParams,

    #[serde(default)]
    pub tokenomics: TokenomicsConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_storage() -> StorageBackend {
    StorageBackend::Lmdb
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./concord_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_workers() -> usize {
    4
}

fn default_deploy_attempts() -> u32 {
    5
}

fn default_audit_capacity() -> usize {
    1024
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// An in-memory configuration for tests.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.sweep_interval_secs == 0 {
            return Err(NodeError::Config("sweep_interval_secs must be positive".into()));
        }
        if self.workers == 0 {
            return Err(NodeError::Config("workers must be positive".into()));
        }
        if let Some(bad) = self.communities.iter().find(|c| !c.is_valid()) {
            return Err(NodeError::Config(format!("invalid community id {bad:?}")));
        }
        self.governance
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        self.tokenomics
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            data_dir: default_data_dir(),
            lmdb_map_size: default_map_size(),
            sweep_interval_secs: default_sweep_interval(),
            workers: default_workers(),
            communities: Vec::new(),
            max_deploy_attempts: default_deploy_attempts(),
            audit_capacity: default_audit_capacity(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            governance: GovernanceParams::default(),
            tokenomics: TokenomicsConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_types::ProposalKind;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.sweep_interval_secs, config.sweep_interval_secs);
        assert_eq!(parsed.governance, config.governance);
        assert_eq!(parsed.tokenomics, config.tokenomics);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.storage, StorageBackend::Lmdb);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_sections_override() {
        let toml = r#"
            storage = "memory"
            sweep_interval_secs = 5
            communities = ["north", "south"]

            [governance.quorum]
            emergency_bps = 5000

            [tokenomics]
            default_budget = 250

            [execution]
            blocked_grace_secs = 60
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.communities.len(), 2);
        assert_eq!(config.governance.quorum_bps(ProposalKind::Emergency), 5000);
        assert_eq!(config.governance.quorum_bps(ProposalKind::Strategic), 3000);
        assert_eq!(config.tokenomics.default_budget, 250);
        assert_eq!(config.execution.blocked_grace_secs, 60);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = NodeConfig::in_memory();
        config.workers = 0;
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));

        let mut config = NodeConfig::in_memory();
        config.governance.quorum.financial_bps = 12_000;
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/concord.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
