//! Proposal identifiers.

use crate::address::Identity;
use crate::error::TypeError;
use crate::time::Timestamp;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

/// A 32-byte proposal identifier.
///
/// Derived once at creation time and never changed afterwards.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId([u8; 32]);

impl ProposalId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an id from the proposer, title, creation time and a registry-local nonce.
    ///
    /// The nonce makes two otherwise identical submissions in the same second distinct.
    pub fn derive(proposer: &Identity, title: &str, created_at: Timestamp, nonce: u64) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(b"concord-proposal");
        hasher.update((proposer.as_str().len() as u64).to_le_bytes());
        hasher.update(proposer.as_str().as_bytes());
        hasher.update((title.len() as u64).to_le_bytes());
        hasher.update(title.as_bytes());
        hasher.update(created_at.as_secs().to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ProposalId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidProposalId(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidProposalId(format!("expected 32 bytes: {s}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let proposer = Identity::from("alice");
        let a = ProposalId::derive(&proposer, "Treasury", Timestamp::new(10), 0);
        let b = ProposalId::derive(&proposer, "Treasury", Timestamp::new(10), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn nonce_separates_identical_submissions() {
        let proposer = Identity::from("alice");
        let a = ProposalId::derive(&proposer, "Treasury", Timestamp::new(10), 0);
        let b = ProposalId::derive(&proposer, "Treasury", Timestamp::new(10), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn hex_round_trip() {
        let id = ProposalId::derive(&Identity::from("bob"), "x", Timestamp::new(1), 7);
        let parsed: ProposalId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn short_hex_is_rejected() {
        assert!("abcd".parse::<ProposalId>().is_err());
        assert!("zz".parse::<ProposalId>().is_err());
    }
}
