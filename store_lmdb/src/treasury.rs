//! LMDB implementation of TreasuryStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use concord_store::treasury::TreasuryStore;
use concord_store::StoreError;
use concord_types::CommunityId;

use crate::LmdbError;

pub struct LmdbTreasuryStore {
    pub(crate) env: Arc<Env>,
    pub(crate) treasuries: Database<Bytes, Bytes>,
}

impl TreasuryStore for LmdbTreasuryStore {
    fn put_treasury(&self, community: &CommunityId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.treasuries
            .put(&mut wtxn, community.as_str().as_bytes(), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_treasury(&self, community: &CommunityId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .treasuries
            .get(&rtxn, community.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn list_communities(&self) -> Result<Vec<CommunityId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in self.treasuries.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let name = std::str::from_utf8(key)
                .map_err(|e| LmdbError::Serialization(e.to_string()))?;
            out.push(CommunityId::new(name));
        }
        Ok(out)
    }
}
