//! Governance parameters: supplied as configuration, never inferred.
//!
//! Quorum thresholds are expressed in basis points of total community stake
//! (`4000` = 40%). Defaults follow the type-specific voting configuration of
//! the original governance service.

use crate::error::TypeError;
use crate::kind::ProposalKind;
use serde::{Deserialize, Serialize};

/// 100% expressed in basis points.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Per-kind quorum thresholds in basis points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumThresholds {
    pub strategic_bps: u32,
    pub operational_bps: u32,
    pub financial_bps: u32,
    pub membership_bps: u32,
    pub governance_bps: u32,
    pub technical_bps: u32,
    pub emergency_bps: u32,
}

impl QuorumThresholds {
    /// The same threshold for every kind. Handy in tests.
    pub fn uniform(bps: u32) -> Self {
        Self {
            strategic_bps: bps,
            operational_bps: bps,
            financial_bps: bps,
            membership_bps: bps,
            governance_bps: bps,
            technical_bps: bps,
            emergency_bps: bps,
        }
    }

    pub fn for_kind(&self, kind: ProposalKind) -> u32 {
        match kind {
            ProposalKind::Strategic => self.strategic_bps,
            ProposalKind::Operational => self.operational_bps,
            ProposalKind::Financial => self.financial_bps,
            ProposalKind::Membership => self.membership_bps,
            ProposalKind::Governance => self.governance_bps,
            ProposalKind::Technical => self.technical_bps,
            ProposalKind::Emergency => self.emergency_bps,
        }
    }

    pub fn set(&mut self, kind: ProposalKind, bps: u32) {
        let slot = match kind {
            ProposalKind::Strategic => &mut self.strategic_bps,
            ProposalKind::Operational => &mut self.operational_bps,
            ProposalKind::Financial => &mut self.financial_bps,
            ProposalKind::Membership => &mut self.membership_bps,
            ProposalKind::Governance => &mut self.governance_bps,
            ProposalKind::Technical => &mut self.technical_bps,
            ProposalKind::Emergency => &mut self.emergency_bps,
        };
        *slot = bps;
    }
}

impl Default for QuorumThresholds {
    fn default() -> Self {
        Self {
            strategic_bps: 3000,   // 30%
            operational_bps: 1500, // 15%
            financial_bps: 2500,   // 25%
            membership_bps: 2000,  // 20%
            governance_bps: 3500,  // 35%
            technical_bps: 2000,   // 20%
            emergency_bps: 1500,   // 15%
        }
    }
}

/// Parameters shared by the proposal registry and the voting engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Quorum threshold per proposal kind.
    pub quorum: QuorumThresholds,

    /// Upper bound on `review_period_days` and `voting_period_days`.
    pub max_period_days: u32,

    /// Minimum stake (in the proposal's community) required to create a proposal.
    /// Zero disables the check.
    pub min_proposer_stake: u64,

    /// Maximum number of phases in one execution plan.
    pub max_plan_phases: usize,
}

impl GovernanceParams {
    pub fn quorum_bps(&self, kind: ProposalKind) -> u32 {
        self.quorum.for_kind(kind)
    }

    /// Reject thresholds above 100% and nonsensical bounds.
    pub fn validate(&self) -> Result<(), TypeError> {
        for kind in ProposalKind::ALL {
            let bps = self.quorum.for_kind(kind);
            if bps > BPS_DENOMINATOR {
                return Err(TypeError::InvalidParam(format!(
                    "quorum for {kind} is {bps} bps, above {BPS_DENOMINATOR}"
                )));
            }
        }
        if self.max_period_days == 0 {
            return Err(TypeError::InvalidParam("max_period_days must be positive".into()));
        }
        if self.max_plan_phases == 0 {
            return Err(TypeError::InvalidParam("max_plan_phases must be positive".into()));
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            quorum: QuorumThresholds::default(),
            max_period_days: 90,
            min_proposer_stake: 0,
            max_plan_phases: 64,
        }
    }
}
