//! Tokenomics configuration.
//!
//! Amounts are `u64` here so the whole structure round-trips through TOML;
//! runtime arithmetic widens to `u128`.

use std::collections::BTreeMap;

use concord_types::{CommunityId, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::TokenomicsError;

/// One step of a tiered fee schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTier {
    /// Volume at which this tier starts to apply (inclusive).
    pub threshold: u64,
    pub fee_bps: u32,
}

/// Flat base fee plus optional volume tiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeStructure {
    pub base_fee_bps: u32,
    /// Strictly ascending by threshold.
    pub volume_tiers: Vec<VolumeTier>,
}

impl Default for FeeStructure {
    fn default() -> Self {
        Self {
            base_fee_bps: 250,
            volume_tiers: vec![
                VolumeTier {
                    threshold: 10_000,
                    fee_bps: 200,
                },
                VolumeTier {
                    threshold: 100_000,
                    fee_bps: 150,
                },
                VolumeTier {
                    threshold: 1_000_000,
                    fee_bps: 100,
                },
            ],
        }
    }
}

impl FeeStructure {
    /// A flat fee with no tiers.
    pub fn flat(fee_bps: u32) -> Self {
        Self {
            base_fee_bps: fee_bps,
            volume_tiers: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), TokenomicsError> {
        if self.base_fee_bps > BPS_DENOMINATOR {
            return Err(TokenomicsError::InvalidConfig(format!(
                "base fee {} bps above {BPS_DENOMINATOR}",
                self.base_fee_bps
            )));
        }
        for (i, tier) in self.volume_tiers.iter().enumerate() {
            if tier.fee_bps > BPS_DENOMINATOR {
                return Err(TokenomicsError::InvalidConfig(format!(
                    "tier {i} fee {} bps above {BPS_DENOMINATOR}",
                    tier.fee_bps
                )));
            }
            if i > 0 && tier.threshold <= self.volume_tiers[i - 1].threshold {
                return Err(TokenomicsError::InvalidConfig(format!(
                    "tier {i} threshold {} does not ascend",
                    tier.threshold
                )));
            }
        }
        Ok(())
    }

    /// Basis points that apply to `volume`: the highest tier whose threshold
    /// is at or below it, otherwise the base fee.
    pub fn fee_bps_for(&self, volume: u128) -> u32 {
        self.volume_tiers
            .iter()
            .rev()
            .find(|t| u128::from(t.threshold) <= volume)
            .map_or(self.base_fee_bps, |t| t.fee_bps)
    }

    pub fn fee_for(&self, volume: u128) -> u128 {
        apply_bps(volume, self.fee_bps_for(volume))
    }
}

/// `amount × bps / 10_000`, rounded down, without intermediate overflow.
pub fn apply_bps(amount: u128, bps: u32) -> u128 {
    let bps = u128::from(bps);
    let denom = u128::from(BPS_DENOMINATOR);
    (amount / denom) * bps + (amount % denom) * bps / denom
}

/// Who may have transactions sponsored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SponsorshipRule {
    pub min_stake: u64,
    pub min_reputation: f64,
    pub max_gas_per_tx: u64,
    /// Requesters absent from the stake snapshot are refused.
    pub require_stakeholder: bool,
}

impl Default for SponsorshipRule {
    fn default() -> Self {
        Self {
            min_stake: 0,
            min_reputation: 0.0,
            max_gas_per_tx: 1_000_000,
            require_stakeholder: true,
        }
    }
}

/// Batching window. A batch flushes at `max_size` transactions or after
/// `max_wait_secs`, whichever comes first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub enabled: bool,
    pub max_size: usize,
    pub max_wait_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 10,
            max_wait_secs: 30,
        }
    }
}

/// Per-community overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityTokenomics {
    pub budget: Option<u64>,
    pub fee: Option<FeeStructure>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenomicsConfig {
    pub fee: FeeStructure,
    /// Treasury budget per accounting period for communities without an override.
    pub default_budget: u64,
    pub accounting_period_secs: u64,
    pub sponsorship: SponsorshipRule,
    pub batching: BatchConfig,
    /// Failed flushes tolerated before a batch is dropped.
    pub max_flush_attempts: u32,
    pub communities: BTreeMap<String, CommunityTokenomics>,
}

impl Default for TokenomicsConfig {
    fn default() -> Self {
        Self {
            fee: FeeStructure::default(),
            default_budget: 1_000_000,
            accounting_period_secs: 30 * 24 * 3600,
            sponsorship: SponsorshipRule::default(),
            batching: BatchConfig::default(),
            max_flush_attempts: 3,
            communities: BTreeMap::new(),
        }
    }
}

impl TokenomicsConfig {
    pub fn validate(&self) -> Result<(), TokenomicsError> {
        self.fee.validate()?;
        for (name, overrides) in &self.communities {
            if let Some(fee) = &overrides.fee {
                fee.validate()
                    .map_err(|e| TokenomicsError::InvalidConfig(format!("community {name}: {e}")))?;
            }
        }
        if self.accounting_period_secs == 0 {
            return Err(TokenomicsError::InvalidConfig(
                "accounting_period_secs must be positive".into(),
            ));
        }
        if self.batching.enabled && self.batching.max_size == 0 {
            return Err(TokenomicsError::InvalidConfig(
                "batching.max_size must be positive".into(),
            ));
        }
        if self.max_flush_attempts == 0 {
            return Err(TokenomicsError::InvalidConfig(
                "max_flush_attempts must be positive".into(),
            ));
        }
        let rep = self.sponsorship.min_reputation;
        if !(0.0..=1.0).contains(&rep) {
            return Err(TokenomicsError::InvalidConfig(format!(
                "sponsorship.min_reputation {rep} outside [0, 1]"
            )));
        }
        Ok(())
    }

    pub fn fee_structure(&self, community: &CommunityId) -> &FeeStructure {
        self.communities
            .get(community.as_str())
            .and_then(|c| c.fee.as_ref())
            .unwrap_or(&self.fee)
    }

    pub fn budget_for(&self, community: &CommunityId) -> u128 {
        let budget = self
            .communities
            .get(community.as_str())
            .and_then(|c| c.budget)
            .unwrap_or(self.default_budget);
        u128::from(budget)
    }
}
