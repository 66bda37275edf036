//! Startup consistency checks for the governance databases.

use std::path::Path;

use heed::types::Bytes;

use crate::environment::{LmdbEnvironment, DATABASES};
use crate::LmdbError;

/// What a check found.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub proposals_checked: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Count every database and verify each proposal has a state record with a
/// matching index entry. Read failures are collected, not raised.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let raw = env.env();
    let rtxn = raw.read_txn()?;

    for &name in DATABASES {
        match raw.open_database::<Bytes, Bytes>(&rtxn, Some(name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{name}': {e}")),
                }
            }
            Ok(None) => report.errors.push(format!("database '{name}' is missing")),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{name}': {e}")),
        }
    }

    let store = env.proposal_store();
    for entry in store.proposals.iter(&rtxn)? {
        let (id, _) = entry?;
        report.proposals_checked += 1;
        let Some(state) = store.proposal_states.get(&rtxn, id)? else {
            report
                .errors
                .push(format!("proposal {} has no state record", hex_prefix(id)));
            continue;
        };
        let mut key = state.to_vec();
        key.push(0);
        key.extend_from_slice(id);
        if store.state_index.get(&rtxn, &key)?.is_none() {
            report.errors.push(format!(
                "proposal {} missing from state index '{}'",
                hex_prefix(id),
                String::from_utf8_lossy(state)
            ));
        }
    }

    Ok(report)
}

fn hex_prefix(id: &[u8]) -> String {
    id.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

/// Reject a data directory that exists but holds no `data.mdb`.
/// A path that does not exist yet is a fresh start.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_store::ProposalStore;
    use concord_types::{ProposalId, ProposalState};

    #[test]
    fn fresh_path_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("not-yet")).is_ok());
    }

    #[test]
    fn existing_dir_without_data_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn populated_environment_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        let store = env.proposal_store();
        store
            .put_proposal(&ProposalId::new([1; 32]), ProposalState::Voting, b"x")
            .unwrap();
        store
            .put_proposal(&ProposalId::new([1; 32]), ProposalState::Passed, b"y")
            .unwrap();

        let report = check_integrity(&env).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.databases_checked, DATABASES.len() as u32);
        assert_eq!(report.proposals_checked, 1);
        assert!(check_data_dir(dir.path()).is_ok());
    }
}
