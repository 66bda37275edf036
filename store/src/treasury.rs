//! Treasury storage trait.

use crate::StoreError;
use concord_types::CommunityId;

/// Storage for per-community treasury accounting state.
pub trait TreasuryStore: Send + Sync {
    fn put_treasury(&self, community: &CommunityId, data: &[u8]) -> Result<(), StoreError>;

    fn get_treasury(&self, community: &CommunityId) -> Result<Option<Vec<u8>>, StoreError>;

    fn list_communities(&self) -> Result<Vec<CommunityId>, StoreError>;
}
