use concord_types::CommunityId;

use crate::{StakeError, Stakeholder};

/// The external source of truth for stake balances.
///
/// The registry pulls a full snapshot per community and never writes back.
pub trait StakingLedger: Send + Sync {
    fn snapshot(&self, community: &CommunityId) -> Result<Vec<Stakeholder>, StakeError>;
}
