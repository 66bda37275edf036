//! Proposal kinds.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What sort of change a proposal asks for. Selects the quorum threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    Strategic,
    Operational,
    Financial,
    Membership,
    Governance,
    Technical,
    Emergency,
}

impl ProposalKind {
    pub const ALL: [ProposalKind; 7] = [
        Self::Strategic,
        Self::Operational,
        Self::Financial,
        Self::Membership,
        Self::Governance,
        Self::Technical,
        Self::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategic => "strategic",
            Self::Operational => "operational",
            Self::Financial => "financial",
            Self::Membership => "membership",
            Self::Governance => "governance",
            Self::Technical => "technical",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}
