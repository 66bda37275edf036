//! The governance node: wires every component together and drives them from
//! a periodic sweep.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use concord_execution::{
    DeploymentTarget, ExecutionEngine, InterCommunityCoordinator, MilestoneSignal, SignalOutcome,
    TickReport,
};
use concord_governance::{
    AdvanceContext, AdvanceOutcome, AuditLog, EventBus, ExecutionOutcome, GovernanceError,
    GovernanceEvent, Proposal, ProposalRegistry, ProposalRequest,
    SignatureVerifier, TallyResult, VoteAck, VoteRequest, VotingEngine,
};
use concord_nullables::NullStore;
use concord_stake::{StakeholderRegistry, StakingLedger};
use concord_store::{ProposalStore, TreasuryStore, VoteStore};
use concord_store_lmdb::environment::DATABASES;
use concord_store_lmdb::integrity::check_integrity;
use concord_store_lmdb::LmdbEnvironment;
use concord_tokenomics::{
    BatchOutcome, BatchReport, GaslessTransaction, GaslessTransactionBatcher, SponsorshipRelay,
    SponsorshipResponse, TokenomicsEngine,
};
use concord_types::{CommunityId, Identity, ProposalId, ProposalState, Timestamp};

use crate::config::{NodeConfig, StorageBackend};
use crate::deployment::{DeploymentDispatcher, DispatchOutcome};
use crate::error::NodeError;
use crate::metrics::GovernanceMetrics;
use crate::pool::ProposalWorkPool;
use crate::shutdown::ShutdownController;

/// External systems the node talks to.
pub struct Collaborators {
    pub ledger: Arc<dyn StakingLedger>,
    pub relay: Arc<dyn SponsorshipRelay>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub deployment: Arc<dyn DeploymentTarget>,
}

struct Stores {
    proposals: Arc<dyn ProposalStore>,
    votes: Arc<dyn VoteStore>,
    treasuries: Arc<dyn TreasuryStore>,
}

fn open_stores(config: &NodeConfig) -> Result<Stores, NodeError> {
    match config.storage {
        StorageBackend::Memory => {
            let store = Arc::new(NullStore::new());
            Ok(Stores {
                proposals: store.clone(),
                votes: store.clone(),
                treasuries: store,
            })
        }
        StorageBackend::Lmdb => {
            let env = LmdbEnvironment::open(
                &config.data_dir,
                DATABASES.len() as u32,
                config.lmdb_map_size,
            )?;
            let report = check_integrity(&env)?;
            if !report.is_healthy() {
                for error in &report.errors {
                    tracing::warn!(%error, "LMDB integrity problem");
                }
            }
            tracing::info!(
                databases = report.databases_checked,
                entries = report.total_entries,
                proposals = report.proposals_checked,
                "LMDB integrity check finished"
            );
            Ok(Stores {
                proposals: Arc::new(env.proposal_store()),
                votes: Arc::new(env.vote_store()),
                treasuries: Arc::new(env.treasury_store()),
            })
        }
    }
}

/// Everything one sweep did.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub stake_failures: Vec<CommunityId>,
    pub ticks: Vec<TickReport>,
    /// Proposals that changed state.
    pub advanced: Vec<(ProposalId, AdvanceOutcome)>,
    pub started_runs: Vec<ProposalId>,
    pub deployments: Vec<(ProposalId, DispatchOutcome)>,
    pub batches: Vec<BatchReport>,
    /// Per-proposal failures; each is retried on the next sweep.
    pub errors: Vec<(ProposalId, String)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeStatus {
    pub proposals_by_state: BTreeMap<String, usize>,
    pub active_runs: usize,
    pub pending_sponsorships: usize,
    pub audit_events: usize,
}

/// A running Concord node.
pub struct GovernanceNode {
    config: Arc<NodeConfig>,
    ledger: Arc<dyn StakingLedger>,
    stake: Arc<StakeholderRegistry>,
    registry: Arc<ProposalRegistry>,
    voting: Arc<VotingEngine>,
    execution: Arc<ExecutionEngine>,
    coordinator: Arc<InterCommunityCoordinator>,
    tokenomics: Arc<TokenomicsEngine>,
    batcher: Arc<GaslessTransactionBatcher>,
    deployments: DeploymentDispatcher,
    audit: Arc<AuditLog>,
    metrics: Arc<GovernanceMetrics>,
    pool: ProposalWorkPool,
    shutdown: Arc<ShutdownController>,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl GovernanceNode {
    /// Build every component from `config`, opening storage and loading
    /// persisted proposals. Call [`GovernanceNode::start`] to begin sweeping.
    pub fn new(config: NodeConfig, collaborators: Collaborators) -> Result<Self, NodeError> {
        config.validate()?;
        let config = Arc::new(config);
        let stores = open_stores(&config)?;
        let params = Arc::new(config.governance.clone());

        let stake = Arc::new(StakeholderRegistry::new());
        let now = Timestamp::now();
        for (community, error) in
            stake.refresh_all(&config.communities, collaborators.ledger.as_ref(), now)
        {
            tracing::warn!(%community, %error, "initial stake snapshot unavailable");
        }

        let events = Arc::new(EventBus::new());
        let audit = AuditLog::attach(&events, config.audit_capacity);
        let metrics = Arc::new(GovernanceMetrics::new()?);
        {
            let metrics = Arc::clone(&metrics);
            events.subscribe(Box::new(move |event| match event {
                GovernanceEvent::ProposalCreated { .. } => metrics.proposals_created.inc(),
                GovernanceEvent::VoteCast { .. } => metrics.votes_cast.inc(),
                GovernanceEvent::Tallied { passed, .. } => {
                    let outcome = if *passed { "passed" } else { "rejected" };
                    metrics.tallies.with_label_values(&[outcome]).inc();
                }
                GovernanceEvent::StateChanged { .. } => {}
            }));
        }

        let registry = Arc::new(ProposalRegistry::load(
            Arc::clone(&params),
            Arc::clone(&stake),
            stores.proposals,
            Arc::clone(&events),
        )?);
        let voting = Arc::new(VotingEngine::new(
            params,
            Arc::clone(&stake),
            collaborators.verifier,
            stores.votes,
            events,
        ));
        let execution = Arc::new(ExecutionEngine::new(Arc::new(config.execution.clone())));
        let coordinator = Arc::new(InterCommunityCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&execution),
        ));
        let tokenomics = Arc::new(TokenomicsEngine::new(
            Arc::new(config.tokenomics.clone()),
            Arc::clone(&stake),
            stores.treasuries,
        )?);
        let batcher = Arc::new(GaslessTransactionBatcher::new(
            Arc::clone(&tokenomics),
            collaborators.relay,
        ));
        let deployments =
            DeploymentDispatcher::new(collaborators.deployment, config.max_deploy_attempts);

        tracing::info!(
            storage = ?config.storage,
            proposals = registry.len(),
            sweep_interval_secs = config.sweep_interval_secs,
            "governance node initialised"
        );

        Ok(Self {
            pool: ProposalWorkPool::new(config.workers),
            config,
            ledger: collaborators.ledger,
            stake,
            registry,
            voting,
            execution,
            coordinator,
            tokenomics,
            batcher,
            deployments,
            audit,
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Mutex::new(Vec::new()),
        })
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn stake(&self) -> &Arc<StakeholderRegistry> {
        &self.stake
    }

    pub fn registry(&self) -> &Arc<ProposalRegistry> {
        &self.registry
    }

    pub fn voting(&self) -> &Arc<VotingEngine> {
        &self.voting
    }

    pub fn execution(&self) -> &Arc<ExecutionEngine> {
        &self.execution
    }

    pub fn coordinator(&self) -> &Arc<InterCommunityCoordinator> {
        &self.coordinator
    }

    pub fn tokenomics(&self) -> &Arc<TokenomicsEngine> {
        &self.tokenomics
    }

    pub fn batcher(&self) -> &Arc<GaslessTransactionBatcher> {
        &self.batcher
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn metrics(&self) -> &Arc<GovernanceMetrics> {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &Arc<ShutdownController> {
        &self.shutdown
    }

    pub fn deployment_reference(&self, id: &ProposalId) -> Option<String> {
        self.deployments.reference(id)
    }

    // ── Operations ─────────────────────────────────────────────────────

    pub fn create_proposal(
        &self,
        request: ProposalRequest,
        now: Timestamp,
    ) -> Result<Proposal, NodeError> {
        Ok(self.registry.create_proposal(request, now)?)
    }

    pub fn submit_proposal(
        &self,
        id: &ProposalId,
        requester: &Identity,
        now: Timestamp,
    ) -> Result<Proposal, NodeError> {
        Ok(self.registry.submit(id, requester, now)?)
    }

    pub fn withdraw_proposal(
        &self,
        id: &ProposalId,
        requester: &Identity,
        now: Timestamp,
    ) -> Result<Proposal, NodeError> {
        Ok(self.registry.withdraw(id, requester, now)?)
    }

    pub fn submit_vote(&self, request: VoteRequest, now: Timestamp) -> Result<VoteAck, NodeError> {
        Ok(self.voting.submit_vote(&self.registry, request, now)?)
    }

    /// Feed a milestone signal to the execution engine. When it finishes the
    /// run, the proposal is advanced straight away instead of on the next
    /// sweep.
    pub fn record_signal(
        &self,
        signal: MilestoneSignal,
        now: Timestamp,
    ) -> Result<SignalOutcome, NodeError> {
        let id = *signal.proposal_id();
        let outcome = self.execution.record_signal(signal, now)?;
        if outcome.run_status.is_finished() {
            self.registry.advance(&id, now, self)?;
        }
        Ok(outcome)
    }

    pub fn request_sponsorship(
        &self,
        tx: GaslessTransaction,
        now: Timestamp,
    ) -> Result<SponsorshipResponse, NodeError> {
        let response = self.batcher.request_sponsorship(tx, now)?;
        if let Some(report) = &response.flush {
            self.record_batch(report);
        }
        Ok(response)
    }

    /// Refresh stake for configured communities and every community with a
    /// proposal still in flight. Returns the communities whose ledger read
    /// failed.
    pub fn refresh_stake(&self, now: Timestamp) -> Vec<CommunityId> {
        let mut communities: BTreeSet<CommunityId> = self.config.communities.iter().cloned().collect();
        communities.extend(self.stake.communities());
        communities.extend(self.registry.active_communities());
        self.stake
            .refresh_all(&communities, self.ledger.as_ref(), now)
            .into_iter()
            .map(|(community, _)| community)
            .collect()
    }

    fn record_batch(&self, report: &BatchReport) {
        let outcome = match report.outcome {
            BatchOutcome::Submitted { .. } => "submitted",
            BatchOutcome::RolledBack { .. } => "rolled_back",
            BatchOutcome::Dropped { .. } => "dropped",
        };
        self.metrics
            .sponsorship_batches
            .with_label_values(&[outcome])
            .inc();
    }

    /// One pass over everything time-driven.
    ///
    /// Order: stake refresh, execution ticks, proposal advances on the worker
    /// pool, run starts and deployments for executing proposals, then expired
    /// sponsorship batches. Failures are collected and logged; nothing here
    /// aborts the sweep.
    pub async fn sweep(self: &Arc<Self>, now: Timestamp) -> SweepReport {
        let started = Instant::now();
        let mut report = SweepReport {
            stake_failures: self.refresh_stake(now),
            ..SweepReport::default()
        };

        report.ticks = self.execution.tick_all(now);

        let mut handles = Vec::new();
        for id in self.registry.due(now) {
            let node = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let worker = Arc::clone(&node);
                let result = node
                    .pool
                    .process(&id, move || {
                        worker
                            .registry
                            .advance(&id, now, worker.as_ref())
                            .map_err(NodeError::from)
                    })
                    .await
                    .and_then(|r| r);
                (id, result)
            }));
        }
        for handle in handles {
            match handle.await {
                Ok((id, Ok(outcome))) => {
                    if !outcome.is_noop() {
                        report.advanced.push((id, outcome));
                    }
                }
                Ok((id, Err(e))) => {
                    tracing::warn!(proposal = %id, error = %e, "advance failed, retrying next sweep");
                    report.errors.push((id, e.to_string()));
                }
                Err(e) => {
                    tracing::error!(error = %e, "advance task panicked");
                }
            }
        }

        match self.registry.list_by_state(ProposalState::Executing) {
            Ok(ids) => {
                for id in ids {
                    if let Err(e) = self.start_execution(&id, now, &mut report) {
                        tracing::warn!(proposal = %id, error = %e, "execution start failed, retrying next sweep");
                        report.errors.push((id, e.to_string()));
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not list executing proposals"),
        }

        report.batches = self.batcher.flush_due(now);
        for batch in &report.batches {
            self.record_batch(batch);
        }

        self.pool.cleanup().await;
        self.update_gauges();
        self.metrics.sweeps.inc();
        self.metrics
            .sweep_errors
            .inc_by(report.errors.len() as u64);
        self.metrics
            .sweep_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        tracing::debug!(
            advanced = report.advanced.len(),
            started_runs = report.started_runs.len(),
            batches = report.batches.len(),
            errors = report.errors.len(),
            "sweep finished"
        );
        report
    }

    fn start_execution(
        &self,
        id: &ProposalId,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), NodeError> {
        let proposal = self.registry.get(id)?;
        if !self.execution.has_run(id) {
            self.execution.start(&proposal, now)?;
            report.started_runs.push(*id);
        }
        match self.deployments.dispatch(&proposal) {
            DispatchOutcome::NotRequested | DispatchOutcome::AlreadyDeployed(_) => {}
            outcome => {
                if matches!(outcome, DispatchOutcome::Deployed(_)) {
                    self.metrics.deployments.inc();
                }
                report.deployments.push((*id, outcome));
            }
        }
        Ok(())
    }

    fn update_gauges(&self) {
        for state in ProposalState::ALL {
            let count = self.registry.list_by_state(state).map_or(0, |ids| ids.len());
            self.metrics.set_state_count(state, count);
        }
        self.metrics
            .active_runs
            .set(self.execution.active_runs().len() as i64);
        self.metrics
            .pending_sponsorships
            .set(self.batcher.pending_count() as i64);
    }

    pub fn status(&self) -> NodeStatus {
        let proposals_by_state = ProposalState::ALL
            .into_iter()
            .map(|state| {
                let count = self.registry.list_by_state(state).map_or(0, |ids| ids.len());
                (state.as_str().to_string(), count)
            })
            .collect();
        NodeStatus {
            proposals_by_state,
            active_runs: self.execution.active_runs().len(),
            pending_sponsorships: self.batcher.pending_count(),
            audit_events: self.audit.recent().len(),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Spawn the periodic sweep.
    pub async fn start(self: &Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        if shutdown.is_triggered() {
            tracing::warn!("node already stopped, not starting sweep");
            return;
        }
        let node = Arc::clone(self);
        let period = Duration::from_secs(self.config.sweep_interval_secs);

        let sweep_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.triggered() => {
                        tracing::info!("sweep task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let report = node.sweep(Timestamp::now()).await;
                        for (id, error) in &report.errors {
                            tracing::warn!(proposal = %id, %error, "sweep error");
                        }
                    }
                }
            }
        });
        self.task_handles.lock().await.push(sweep_handle);
        tracing::info!("governance node started");
    }

    /// Signal every task and wait for them to finish.
    pub async fn stop(&self) {
        tracing::info!("governance node stopping");
        self.shutdown.shutdown();
        let handles: Vec<_> = self.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        tracing::info!("governance node stopped");
    }
}

impl AdvanceContext for GovernanceNode {
    fn tally(&self, proposal: &Proposal) -> Result<TallyResult, GovernanceError> {
        self.voting.tally(proposal)
    }

    fn execution_outcome(&self, id: &ProposalId) -> Option<ExecutionOutcome> {
        self.execution.outcome(id)
    }
}

impl std::fmt::Debug for GovernanceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceNode")
            .field("storage", &self.config.storage)
            .field("proposals", &self.registry.len())
            .finish_non_exhaustive()
    }
}
