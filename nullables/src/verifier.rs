//! Nullable signature verifier.

use concord_governance::SignatureVerifier;
use concord_types::Identity;

/// Accepts any non-empty signature, or nothing at all when built with
/// [`NullVerifier::rejecting`].
#[derive(Default)]
pub struct NullVerifier {
    reject_all: bool,
}

impl NullVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self { reject_all: true }
    }
}

impl SignatureVerifier for NullVerifier {
    fn verify(&self, _voter: &Identity, _payload: &[u8], signature: &[u8]) -> bool {
        !self.reject_all && !signature.is_empty()
    }
}
