//! Phase execution for proposals in `Executing`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use concord_governance::{ExecutionOutcome, ExecutionPlan, PhaseId, Proposal, TimelineScheduler};
use concord_types::{CommunityId, Identity, ProposalId, ProposalState, Timestamp};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{ExecutionConfig, ExecutionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseProgress {
    pub phase: PhaseId,
    pub status: MilestoneStatus,
    pub satisfied: BTreeSet<String>,
    pub started_at: Option<Timestamp>,
    pub deadline: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub blocked_since: Option<Timestamp>,
}

impl PhaseProgress {
    fn pending(phase: PhaseId) -> Self {
        Self {
            phase,
            status: MilestoneStatus::Pending,
            satisfied: BTreeSet::new(),
            started_at: None,
            deadline: None,
            completed_at: None,
            blocked_since: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed { reason: String },
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionRun {
    pub proposal_id: ProposalId,
    pub community: CommunityId,
    pub plan: ExecutionPlan,
    pub phases: BTreeMap<PhaseId, PhaseProgress>,
    pub status: RunStatus,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl ExecutionRun {
    fn progress_mut(&mut self, phase: &PhaseId) -> Result<&mut PhaseProgress, ExecutionError> {
        self.phases
            .get_mut(phase)
            .ok_or_else(|| ExecutionError::UnknownPhase(phase.to_string()))
    }

    fn start_phase(&mut self, phase: &PhaseId, now: Timestamp) {
        let Some(days) = self.plan.phase(phase).map(|p| p.estimated_duration_days) else {
            return;
        };
        if let Some(progress) = self.phases.get_mut(phase) {
            progress.status = MilestoneStatus::InProgress;
            progress.started_at = Some(now);
            progress.deadline = Some(now.plus_days(days));
        }
    }

    fn completion_times(&self) -> HashMap<PhaseId, Timestamp> {
        self.phases
            .values()
            .filter_map(|p| p.completed_at.map(|t| (p.phase.clone(), t)))
            .collect()
    }

    /// Start every pending phase whose dependencies are all complete.
    fn start_ready(&mut self, now: Timestamp) -> Vec<PhaseId> {
        let done = self.completion_times();
        let ready: Vec<PhaseId> = self
            .phases
            .values()
            .filter(|p| p.status == MilestoneStatus::Pending)
            .filter(|p| {
                TimelineScheduler::earliest_start(&self.plan, &p.phase, &done, self.started_at)
                    .is_some()
            })
            .map(|p| p.phase.clone())
            .collect();
        for phase in &ready {
            self.start_phase(phase, now);
        }
        ready
    }

    fn complete_phase(&mut self, phase: &PhaseId, now: Timestamp) -> Vec<PhaseId> {
        if let Some(progress) = self.phases.get_mut(phase) {
            progress.status = MilestoneStatus::Completed;
            progress.completed_at = Some(now);
            progress.blocked_since = None;
        }
        let started = self.start_ready(now);
        if self
            .phases
            .values()
            .all(|p| p.status == MilestoneStatus::Completed)
        {
            self.status = RunStatus::Completed;
            self.finished_at = Some(now);
        }
        started
    }

    fn ensure_running(&self) -> Result<(), ExecutionError> {
        match &self.status {
            RunStatus::InProgress => Ok(()),
            RunStatus::Completed => Err(ExecutionError::InvalidState(format!(
                "execution of {} already completed",
                self.proposal_id
            ))),
            RunStatus::Failed { reason } => Err(ExecutionError::ExecutionFailure(reason.clone())),
        }
    }

    fn check_agent(&self, phase: &PhaseId, agent: &Identity) -> Result<(), ExecutionError> {
        let spec = self
            .plan
            .phase(phase)
            .ok_or_else(|| ExecutionError::UnknownPhase(phase.to_string()))?;
        if !spec.responsible_agents.contains(agent) {
            return Err(ExecutionError::Unauthorized(format!(
                "{agent} is not responsible for phase {phase}"
            )));
        }
        Ok(())
    }
}

/// An external milestone-completion signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MilestoneSignal {
    /// A responsible agent marks one completion criterion satisfied.
    CriterionSatisfied {
        proposal_id: ProposalId,
        phase: PhaseId,
        criterion: String,
        agent: Identity,
    },
    /// A responsible agent reports a phase's status directly.
    StatusReport {
        proposal_id: ProposalId,
        milestone: PhaseId,
        status: MilestoneStatus,
        reporter: Identity,
    },
}

impl MilestoneSignal {
    pub fn proposal_id(&self) -> &ProposalId {
        match self {
            Self::CriterionSatisfied { proposal_id, .. } | Self::StatusReport { proposal_id, .. } => {
                proposal_id
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalOutcome {
    pub phase: PhaseId,
    pub phase_status: MilestoneStatus,
    /// Dependents that became ready and started.
    pub started: Vec<PhaseId>,
    pub run_status: RunStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub proposal_id: ProposalId,
    pub newly_blocked: Vec<PhaseId>,
    pub status: RunStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverableReport {
    pub phase: PhaseId,
    pub deliverables: Vec<String>,
    pub status: MilestoneStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverableStatus {
    pub overall: MilestoneStatus,
    pub phases: Vec<DeliverableReport>,
}

pub struct ExecutionEngine {
    config: Arc<ExecutionConfig>,
    runs: RwLock<HashMap<ProposalId, Arc<Mutex<ExecutionRun>>>>,
}

fn lock(run: &Mutex<ExecutionRun>) -> MutexGuard<'_, ExecutionRun> {
    run.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExecutionEngine {
    pub fn new(config: Arc<ExecutionConfig>) -> Self {
        Self {
            config,
            runs: RwLock::new(HashMap::new()),
        }
    }

    fn handle(&self, id: &ProposalId) -> Result<Arc<Mutex<ExecutionRun>>, ExecutionError> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or(ExecutionError::RunNotFound(*id))
    }

    /// Begin executing a proposal. Phases without dependencies start now.
    /// Starting a proposal that already has a run returns that run.
    pub fn start(&self, proposal: &Proposal, now: Timestamp) -> Result<ExecutionRun, ExecutionError> {
        if proposal.state != ProposalState::Executing {
            return Err(ExecutionError::InvalidState(format!(
                "proposal {} is {}, not executing",
                proposal.id, proposal.state
            )));
        }
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = runs.get(&proposal.id) {
            return Ok(lock(existing).clone());
        }

        let mut run = ExecutionRun {
            proposal_id: proposal.id,
            community: proposal.community.clone(),
            plan: proposal.plan.clone(),
            phases: proposal
                .plan
                .phases
                .iter()
                .map(|p| (p.id.clone(), PhaseProgress::pending(p.id.clone())))
                .collect(),
            status: RunStatus::InProgress,
            started_at: now,
            finished_at: None,
        };
        let started = run.start_ready(now);
        tracing::info!(proposal = %proposal.id, phases = run.phases.len(), started = started.len(), "execution started");
        runs.insert(proposal.id, Arc::new(Mutex::new(run.clone())));
        Ok(run)
    }

    pub fn record_signal(
        &self,
        signal: MilestoneSignal,
        now: Timestamp,
    ) -> Result<SignalOutcome, ExecutionError> {
        let handle = self.handle(signal.proposal_id())?;
        let mut run = lock(&handle);
        run.ensure_running()?;

        match signal {
            MilestoneSignal::CriterionSatisfied {
                proposal_id,
                phase,
                criterion,
                agent,
            } => {
                run.check_agent(&phase, &agent)?;
                let criteria: BTreeSet<String> = run
                    .plan
                    .phase(&phase)
                    .map(|p| p.completion_criteria.iter().cloned().collect())
                    .unwrap_or_default();
                if !criteria.contains(&criterion) {
                    return Err(ExecutionError::UnknownCriterion {
                        phase: phase.to_string(),
                        criterion,
                    });
                }
                let progress = run.progress_mut(&phase)?;
                match progress.status {
                    MilestoneStatus::Pending => {
                        return Err(ExecutionError::InvalidState(format!(
                            "phase {phase} has not started"
                        )))
                    }
                    MilestoneStatus::Completed => {
                        return Err(ExecutionError::InvalidState(format!(
                            "phase {phase} is already completed"
                        )))
                    }
                    MilestoneStatus::InProgress | MilestoneStatus::Blocked => {}
                }
                progress.satisfied.insert(criterion);
                let all = progress.satisfied.len() == criteria.len();

                let started = if all {
                    tracing::info!(proposal = %proposal_id, %phase, "phase completed");
                    run.complete_phase(&phase, now)
                } else {
                    Vec::new()
                };
                Ok(SignalOutcome {
                    phase_status: run.phases[&phase].status,
                    phase,
                    started,
                    run_status: run.status.clone(),
                })
            }
            MilestoneSignal::StatusReport {
                proposal_id,
                milestone,
                status,
                reporter,
            } => {
                run.check_agent(&milestone, &reporter)?;
                let current = run.progress_mut(&milestone)?.status;
                let started = match (current, status) {
                    (MilestoneStatus::Pending, _) => {
                        return Err(ExecutionError::InvalidState(format!(
                            "phase {milestone} has not started"
                        )))
                    }
                    (MilestoneStatus::Completed, _) | (_, MilestoneStatus::Pending) => {
                        return Err(ExecutionError::InvalidState(format!(
                            "cannot move phase {milestone} from {current:?} to {status:?}"
                        )))
                    }
                    (_, MilestoneStatus::Completed) => {
                        let criteria = run
                            .plan
                            .phase(&milestone)
                            .map(|p| p.completion_criteria.clone())
                            .unwrap_or_default();
                        run.progress_mut(&milestone)?.satisfied.extend(criteria);
                        tracing::info!(proposal = %proposal_id, phase = %milestone, "phase reported complete");
                        run.complete_phase(&milestone, now)
                    }
                    (_, MilestoneStatus::Blocked) => {
                        let progress = run.progress_mut(&milestone)?;
                        if progress.blocked_since.is_none() {
                            progress.blocked_since = Some(now);
                        }
                        progress.status = MilestoneStatus::Blocked;
                        tracing::warn!(proposal = %proposal_id, phase = %milestone, "phase reported blocked");
                        Vec::new()
                    }
                    (_, MilestoneStatus::InProgress) => {
                        let progress = run.progress_mut(&milestone)?;
                        if progress.deadline.is_some_and(|d| now > d) {
                            return Err(ExecutionError::InvalidState(format!(
                                "phase {milestone} is past its deadline, only completion unblocks it"
                            )));
                        }
                        progress.status = MilestoneStatus::InProgress;
                        progress.blocked_since = None;
                        Vec::new()
                    }
                };
                Ok(SignalOutcome {
                    phase_status: run.phases[&milestone].status,
                    phase: milestone,
                    started,
                    run_status: run.status.clone(),
                })
            }
        }
    }

    /// Block overdue phases and fail the run once a phase has been blocked
    /// for longer than the grace period.
    pub fn tick(&self, id: &ProposalId, now: Timestamp) -> Result<TickReport, ExecutionError> {
        let handle = self.handle(id)?;
        let mut run = lock(&handle);
        let mut newly_blocked = Vec::new();

        if !run.status.is_finished() {
            for progress in run.phases.values_mut() {
                if progress.status == MilestoneStatus::InProgress
                    && progress.deadline.is_some_and(|d| now > d)
                {
                    progress.status = MilestoneStatus::Blocked;
                    progress.blocked_since = Some(now);
                    newly_blocked.push(progress.phase.clone());
                }
            }
            for phase in &newly_blocked {
                tracing::warn!(proposal = %id, %phase, "phase missed its deadline");
            }

            let grace = self.config.blocked_grace_secs;
            let expired = run
                .phases
                .values()
                .find(|p| {
                    p.status == MilestoneStatus::Blocked
                        && p.blocked_since.is_some_and(|since| since.has_expired(grace, now))
                })
                .map(|p| format!("phase {} blocked beyond the grace period", p.phase));
            if let Some(reason) = expired {
                tracing::warn!(proposal = %id, %reason, "execution failed");
                run.status = RunStatus::Failed { reason };
                run.finished_at = Some(now);
            }
        }

        Ok(TickReport {
            proposal_id: *id,
            newly_blocked,
            status: run.status.clone(),
        })
    }

    /// Tick every unfinished run in parallel.
    pub fn tick_all(&self, now: Timestamp) -> Vec<TickReport> {
        let ids = self.active_runs();
        ids.par_iter()
            .filter_map(|id| self.tick(id, now).ok())
            .collect()
    }

    pub fn status(&self, id: &ProposalId) -> Result<RunStatus, ExecutionError> {
        let handle = self.handle(id)?;
        let status = lock(&handle).status.clone();
        Ok(status)
    }

    pub fn run(&self, id: &ProposalId) -> Result<ExecutionRun, ExecutionError> {
        let handle = self.handle(id)?;
        let run = lock(&handle).clone();
        Ok(run)
    }

    pub fn has_run(&self, id: &ProposalId) -> bool {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Per-phase deliverables and an overall status: `Completed` when the
    /// run completed, `Blocked` when it failed or any phase is blocked,
    /// `InProgress` otherwise.
    pub fn deliverable_status(&self, id: &ProposalId) -> Result<DeliverableStatus, ExecutionError> {
        let handle = self.handle(id)?;
        let run = lock(&handle);
        let phases = run
            .plan
            .phases
            .iter()
            .map(|p| DeliverableReport {
                phase: p.id.clone(),
                deliverables: p.deliverables.clone(),
                status: run
                    .phases
                    .get(&p.id)
                    .map_or(MilestoneStatus::Pending, |pp| pp.status),
            })
            .collect::<Vec<_>>();
        let overall = match run.status {
            RunStatus::Completed => MilestoneStatus::Completed,
            RunStatus::Failed { .. } => MilestoneStatus::Blocked,
            RunStatus::InProgress
                if phases.iter().any(|p| p.status == MilestoneStatus::Blocked) =>
            {
                MilestoneStatus::Blocked
            }
            RunStatus::InProgress => MilestoneStatus::InProgress,
        };
        Ok(DeliverableStatus { overall, phases })
    }

    /// The finished outcome the proposal registry acts on.
    pub fn outcome(&self, id: &ProposalId) -> Option<ExecutionOutcome> {
        match self.status(id).ok()? {
            RunStatus::InProgress => None,
            RunStatus::Completed => Some(ExecutionOutcome::Completed),
            RunStatus::Failed { reason } => Some(ExecutionOutcome::Failed(reason)),
        }
    }

    pub fn active_runs(&self) -> Vec<ProposalId> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = runs
            .iter()
            .filter(|(_, r)| !lock(r).status.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use concord_governance::{
        Phase, PeriodKind, ProposalPeriods, TimelinePeriod, TimelineSpec,
    };
    use concord_types::time::SECS_PER_DAY;
    use concord_types::ProposalKind;

    use super::*;

    pub(crate) fn phase(id: &str, deps: &[&str], criteria: &[&str]) -> Phase {
        Phase {
            id: PhaseId::from(id),
            name: id.to_uppercase(),
            objectives: vec![],
            deliverables: vec![format!("{id}-report")],
            estimated_duration_days: 2,
            responsible_agents: BTreeSet::from([Identity::from("agent")]),
            completion_criteria: criteria.iter().map(|c| c.to_string()).collect(),
            dependencies: deps.iter().map(|d| PhaseId::from(*d)).collect(),
        }
    }

    pub(crate) fn executing(seed: &str, community: &str, phases: Vec<Phase>) -> Proposal {
        let id = ProposalId::derive(&Identity::from(seed), seed, Timestamp::EPOCH, 0);
        let period = |kind| TimelinePeriod {
            proposal_id: id,
            kind,
            opens_at: Timestamp::EPOCH,
            closes_at: Timestamp::EPOCH,
        };
        Proposal {
            id,
            title: seed.to_string(),
            description: "test".to_string(),
            kind: ProposalKind::Operational,
            proposer: Identity::from(seed),
            community: CommunityId::from(community),
            stakeholders: BTreeSet::new(),
            open_membership: true,
            plan: ExecutionPlan::new(phases),
            timeline: TimelineSpec {
                review_period_days: 1,
                voting_period_days: 1,
                key_milestones: vec![],
            },
            periods: ProposalPeriods {
                review: period(PeriodKind::Review),
                voting: period(PeriodKind::Voting),
            },
            state: ProposalState::Executing,
            created_at: Timestamp::EPOCH,
            submitted_at: Some(Timestamp::EPOCH),
            tally: None,
            budget_request: None,
            failure_reason: None,
            history: vec![],
        }
    }

    fn satisfy(p: &Proposal, phase: &str, criterion: &str, agent: &str) -> MilestoneSignal {
        MilestoneSignal::CriterionSatisfied {
            proposal_id: p.id,
            phase: PhaseId::from(phase),
            criterion: criterion.to_string(),
            agent: Identity::from(agent),
        }
    }

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(Arc::new(ExecutionConfig::default()))
    }

    const T0: Timestamp = Timestamp::EPOCH;

    #[test]
    fn dependent_phase_waits_for_its_dependency() {
        let engine = engine();
        let p = executing("a", "north", vec![phase("a", &[], &["done"]), phase("b", &["a"], &["done"])]);
        let run = engine.start(&p, T0).unwrap();
        assert_eq!(run.phases[&PhaseId::from("a")].status, MilestoneStatus::InProgress);
        assert_eq!(run.phases[&PhaseId::from("b")].status, MilestoneStatus::Pending);

        let err = engine.record_signal(satisfy(&p, "b", "done", "agent"), T0).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidState(_)));

        let out = engine.record_signal(satisfy(&p, "a", "done", "agent"), T0.plus_secs(10)).unwrap();
        assert_eq!(out.phase_status, MilestoneStatus::Completed);
        assert_eq!(out.started, vec![PhaseId::from("b")]);

        let run = engine.run(&p.id).unwrap();
        let b = &run.phases[&PhaseId::from("b")];
        assert_eq!(b.started_at, Some(T0.plus_secs(10)));
        assert_eq!(b.deadline, Some(T0.plus_secs(10).plus_days(2)));
    }

    #[test]
    fn phase_completes_only_when_every_criterion_is_met() {
        let engine = engine();
        let p = executing("c", "north", vec![phase("a", &[], &["built", "audited"])]);
        engine.start(&p, T0).unwrap();

        let out = engine.record_signal(satisfy(&p, "a", "built", "agent"), T0).unwrap();
        assert_eq!(out.phase_status, MilestoneStatus::InProgress);
        assert_eq!(out.run_status, RunStatus::InProgress);

        let out = engine.record_signal(satisfy(&p, "a", "audited", "agent"), T0).unwrap();
        assert_eq!(out.phase_status, MilestoneStatus::Completed);
        assert_eq!(out.run_status, RunStatus::Completed);
        assert_eq!(engine.outcome(&p.id), Some(ExecutionOutcome::Completed));
    }

    #[test]
    fn only_responsible_agents_may_signal() {
        let engine = engine();
        let p = executing("d", "north", vec![phase("a", &[], &["done"])]);
        engine.start(&p, T0).unwrap();
        let err = engine.record_signal(satisfy(&p, "a", "done", "mallory"), T0).unwrap_err();
        assert!(matches!(err, ExecutionError::Unauthorized(_)));
        let err = engine.record_signal(satisfy(&p, "a", "nope", "agent"), T0).unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownCriterion { .. }));
    }

    #[test]
    fn overdue_phase_blocks_then_fails_after_grace() {
        let engine = engine();
        let p = executing("e", "north", vec![phase("a", &[], &["done"])]);
        engine.start(&p, T0).unwrap();

        let deadline = T0.plus_days(2);
        let report = engine.tick(&p.id, deadline).unwrap();
        assert!(report.newly_blocked.is_empty());

        let late = deadline.plus_secs(1);
        let report = engine.tick(&p.id, late).unwrap();
        assert_eq!(report.newly_blocked, vec![PhaseId::from("a")]);
        assert_eq!(report.status, RunStatus::InProgress);
        assert_eq!(
            engine.deliverable_status(&p.id).unwrap().overall,
            MilestoneStatus::Blocked
        );

        let report = engine.tick(&p.id, late.plus_secs(7 * SECS_PER_DAY)).unwrap();
        assert!(matches!(report.status, RunStatus::Failed { .. }));
        assert!(matches!(engine.outcome(&p.id), Some(ExecutionOutcome::Failed(_))));

        let err = engine.record_signal(satisfy(&p, "a", "done", "agent"), late).unwrap_err();
        assert!(matches!(err, ExecutionError::ExecutionFailure(_)));
        assert!(engine.active_runs().is_empty());
    }

    #[test]
    fn blocked_phase_can_still_complete() {
        let engine = engine();
        let p = executing("f", "north", vec![phase("a", &[], &["done"])]);
        engine.start(&p, T0).unwrap();
        engine.tick(&p.id, T0.plus_days(3)).unwrap();
        let out = engine
            .record_signal(satisfy(&p, "a", "done", "agent"), T0.plus_days(3))
            .unwrap();
        assert_eq!(out.run_status, RunStatus::Completed);
    }

    #[test]
    fn status_report_drives_phases() {
        let engine = engine();
        let p = executing("g", "north", vec![phase("a", &[], &["x", "y"]), phase("b", &["a"], &["z"])]);
        engine.start(&p, T0).unwrap();
        let report = |milestone: &str, status| MilestoneSignal::StatusReport {
            proposal_id: p.id,
            milestone: PhaseId::from(milestone),
            status,
            reporter: Identity::from("agent"),
        };

        let out = engine.record_signal(report("a", MilestoneStatus::Blocked), T0).unwrap();
        assert_eq!(out.phase_status, MilestoneStatus::Blocked);
        let out = engine.record_signal(report("a", MilestoneStatus::Completed), T0).unwrap();
        assert_eq!(out.started, vec![PhaseId::from("b")]);
        let err = engine.record_signal(report("a", MilestoneStatus::InProgress), T0).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidState(_)));
    }

    #[test]
    fn overdue_phase_cannot_be_reported_back_in_progress() {
        let engine = ExecutionEngine::new(Arc::new(ExecutionConfig {
            blocked_grace_secs: 7 * SECS_PER_DAY,
        }));
        let p = executing("k", "north", vec![phase("a", &[], &["done"])]);
        engine.start(&p, T0).unwrap();
        let in_progress = MilestoneSignal::StatusReport {
            proposal_id: p.id,
            milestone: PhaseId::from("a"),
            status: MilestoneStatus::InProgress,
            reporter: Identity::from("agent"),
        };

        let overdue = T0.plus_days(3);
        assert_eq!(engine.tick(&p.id, overdue).unwrap().newly_blocked, vec![PhaseId::from("a")]);
        for day in [4, 6, 8] {
            let err = engine.record_signal(in_progress.clone(), T0.plus_days(day)).unwrap_err();
            assert!(matches!(err, ExecutionError::InvalidState(_)));
            assert_eq!(engine.tick(&p.id, T0.plus_days(day)).unwrap().status, RunStatus::InProgress);
        }

        let report = engine.tick(&p.id, overdue.plus_days(7)).unwrap();
        assert!(matches!(report.status, RunStatus::Failed { .. }));
    }

    #[test]
    fn reported_block_before_the_deadline_can_be_lifted() {
        let engine = engine();
        let p = executing("l", "north", vec![phase("a", &[], &["done"])]);
        engine.start(&p, T0).unwrap();
        let report = |status| MilestoneSignal::StatusReport {
            proposal_id: p.id,
            milestone: PhaseId::from("a"),
            status,
            reporter: Identity::from("agent"),
        };
        engine.record_signal(report(MilestoneStatus::Blocked), T0.plus_secs(60)).unwrap();
        let out = engine
            .record_signal(report(MilestoneStatus::InProgress), T0.plus_days(1))
            .unwrap();
        assert_eq!(out.phase_status, MilestoneStatus::InProgress);
        assert!(engine.run(&p.id).unwrap().phases[&PhaseId::from("a")].blocked_since.is_none());
    }

    #[test]
    fn start_requires_executing_and_is_idempotent() {
        let engine = engine();
        let mut p = executing("h", "north", vec![phase("a", &[], &["done"])]);
        p.state = ProposalState::Passed;
        assert!(matches!(engine.start(&p, T0), Err(ExecutionError::InvalidState(_))));

        p.state = ProposalState::Executing;
        engine.start(&p, T0).unwrap();
        engine.record_signal(satisfy(&p, "a", "done", "agent"), T0).unwrap();
        let again = engine.start(&p, T0.plus_secs(5)).unwrap();
        assert_eq!(again.status, RunStatus::Completed);
        assert_eq!(again.started_at, T0);
    }

    #[test]
    fn tick_all_covers_every_active_run() {
        let engine = engine();
        let p1 = executing("i", "north", vec![phase("a", &[], &["done"])]);
        let p2 = executing("j", "south", vec![phase("a", &[], &["done"])]);
        engine.start(&p1, T0).unwrap();
        engine.start(&p2, T0).unwrap();
        let reports = engine.tick_all(T0.plus_days(5));
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.newly_blocked.len() == 1));
    }

    #[test]
    fn unknown_run_is_reported() {
        let engine = engine();
        let id = ProposalId::ZERO;
        assert!(matches!(engine.status(&id), Err(ExecutionError::RunNotFound(_))));
        assert_eq!(engine.outcome(&id), None);
    }
}
