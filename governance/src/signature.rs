//! Vote signature verification.

use concord_types::{Identity, ProposalId};
use ed25519_dalek::{Verifier, VerifyingKey};

use crate::voting::VoteOption;

const VOTE_DOMAIN: &[u8] = b"concord-vote:";

/// Checks that a vote was authorized by the voter it names.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, voter: &Identity, payload: &[u8], signature: &[u8]) -> bool;
}

/// The bytes a voter signs: domain tag, proposal id, option byte and the
/// voter's nonce (big-endian). The nonce must grow with every vote the voter
/// casts on a proposal, so an old signature cannot be submitted again.
pub fn vote_payload(proposal: &ProposalId, option: VoteOption, nonce: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(VOTE_DOMAIN.len() + 41);
    payload.extend_from_slice(VOTE_DOMAIN);
    payload.extend_from_slice(proposal.as_bytes());
    payload.push(option.as_byte());
    payload.extend_from_slice(&nonce.to_be_bytes());
    payload
}

/// Treats each identity as a hex-encoded Ed25519 public key.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, voter: &Identity, payload: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = hex::decode(voter.as_str()) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(payload, &sig).is_ok()
    }
}
