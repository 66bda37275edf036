//! Governance audit events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use concord_types::{Identity, ProposalId, ProposalKind, ProposalState, Timestamp};

use crate::voting::VoteOption;

#[derive(Clone, Debug, PartialEq)]
pub enum GovernanceEvent {
    ProposalCreated {
        id: ProposalId,
        kind: ProposalKind,
        proposer: Identity,
        state: ProposalState,
        at: Timestamp,
    },
    StateChanged {
        id: ProposalId,
        from: ProposalState,
        to: ProposalState,
        at: Timestamp,
    },
    VoteCast {
        id: ProposalId,
        voter: Identity,
        option: VoteOption,
        replaced: Option<VoteOption>,
        at: Timestamp,
    },
    Tallied {
        id: ProposalId,
        passed: bool,
        participation_bps: u32,
        at: Timestamp,
    },
}

impl GovernanceEvent {
    pub fn proposal_id(&self) -> &ProposalId {
        match self {
            Self::ProposalCreated { id, .. }
            | Self::StateChanged { id, .. }
            | Self::VoteCast { id, .. }
            | Self::Tallied { id, .. } => id,
        }
    }
}

type Listener = Box<dyn Fn(&GovernanceEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting thread, usually while a proposal lock
/// is held. Keep them short and never call back into the registry.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn emit(&self, event: &GovernanceEvent) {
        for listener in self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            listener(event);
        }
    }
}

/// Bounded in-memory record of recent events.
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<GovernanceEvent>>,
}

impl AuditLog {
    /// Create a log and subscribe it to `bus`.
    pub fn attach(bus: &EventBus, capacity: usize) -> Arc<Self> {
        let log = Arc::new(Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        });
        let sink = Arc::clone(&log);
        bus.subscribe(Box::new(move |event| sink.record(event.clone())));
        log
    }

    fn record(&self, event: GovernanceEvent) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    pub fn recent(&self) -> Vec<GovernanceEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Events for one proposal, oldest first.
    pub fn for_proposal(&self, id: &ProposalId) -> Vec<GovernanceEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.proposal_id() == id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn changed(seed: u8) -> GovernanceEvent {
        GovernanceEvent::StateChanged {
            id: ProposalId::new([seed; 32]),
            from: ProposalState::UnderReview,
            to: ProposalState::Voting,
            at: Timestamp::EPOCH,
        }
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&changed(1));
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn audit_log_drops_oldest_beyond_capacity() {
        let bus = EventBus::new();
        let log = AuditLog::attach(&bus, 2);
        bus.emit(&changed(1));
        bus.emit(&changed(2));
        bus.emit(&changed(1));

        assert_eq!(log.recent().len(), 2);
        assert_eq!(log.for_proposal(&ProposalId::new([1; 32])).len(), 1);
        assert_eq!(log.for_proposal(&ProposalId::new([2; 32])).len(), 1);
    }
}
