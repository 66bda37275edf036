use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

use concord_types::ProposalId;

use crate::NodeError;

/// Per-proposal lock for parallel proposal work.
/// Work on different proposals runs concurrently; work on the same proposal
/// is serialized.
pub struct ProposalWorkPool {
    proposal_locks: Arc<Mutex<HashMap<ProposalId, Arc<Mutex<()>>>>>,
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
}

impl ProposalWorkPool {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            proposal_locks: Arc::new(Mutex::new(HashMap::new())),
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    async fn proposal_lock(&self, id: &ProposalId) -> Arc<Mutex<()>> {
        let mut locks = self.proposal_locks.lock().await;
        Arc::clone(locks.entry(*id).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Run `f` on a blocking worker while holding the proposal's lock.
    pub async fn process<F, R>(&self, id: &ProposalId, f: F) -> Result<R, NodeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| NodeError::Worker(e.to_string()))?;
        let lock = self.proposal_lock(id).await;
        let _guard = lock.lock().await;

        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| NodeError::Worker(e.to_string()))
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of proposals with a lock entry.
    pub async fn tracked_proposals(&self) -> usize {
        self.proposal_locks.lock().await.len()
    }

    /// Drop locks nobody is waiting on.
    pub async fn cleanup(&self) {
        let mut locks = self.proposal_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    fn pid(n: u8) -> ProposalId {
        ProposalId::new([n; 32])
    }

    #[tokio::test]
    async fn returns_the_closure_result() {
        let pool = ProposalWorkPool::new(4);
        assert_eq!(pool.process(&pid(1), || 42).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn different_proposals_run_in_parallel() {
        let pool = Arc::new(ProposalWorkPool::new(4));
        let start = Instant::now();
        let mut handles = Vec::new();
        for i in 0..4u8 {
            let p = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                p.process(&pid(i), move || {
                    std::thread::sleep(Duration::from_millis(50));
                    i
                })
                .await
            }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }
        assert!(
            start.elapsed() < Duration::from_millis(200),
            "expected parallel execution, took {:?}",
            start.elapsed()
        );
        results.sort();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn same_proposal_is_serialized() {
        let pool = Arc::new(ProposalWorkPool::new(4));
        let in_flight = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let p = Arc::clone(&pool);
            let f = Arc::clone(&in_flight);
            let m = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                p.process(&pid(9), move || {
                    let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                    m.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(10));
                    f.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn semaphore_limits_concurrency() {
        let pool = Arc::new(ProposalWorkPool::new(2));
        let in_flight = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();
        for i in 0..6u8 {
            let p = Arc::clone(&pool);
            let f = Arc::clone(&in_flight);
            let m = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                p.process(&pid(i), move || {
                    let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                    m.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    f.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cleanup_removes_idle_locks() {
        let pool = ProposalWorkPool::new(4);
        pool.process(&pid(1), || ()).await.unwrap();
        pool.process(&pid(2), || ()).await.unwrap();
        assert_eq!(pool.tracked_proposals().await, 2);
        pool.cleanup().await;
        assert_eq!(pool.tracked_proposals().await, 0);
        assert_eq!(pool.max_concurrent(), 4);
    }
}
