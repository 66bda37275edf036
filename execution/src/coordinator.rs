//! Cross-community projects.
//!
//! A project is a named group of proposals, usually from different
//! communities, sharing one timeline. Its status is never stored; it is
//! recomputed from the member proposals and their execution runs on every
//! read.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use concord_governance::{GovernanceError, ProposalRegistry};
use concord_types::{CommunityId, ProposalId, ProposalState, Timestamp};
use serde::{Deserialize, Serialize};

use crate::engine::{ExecutionEngine, MilestoneStatus};
use crate::ExecutionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTimeline {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub community: CommunityId,
    pub proposal_id: ProposalId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCommunityProject {
    pub id: ProjectId,
    pub name: String,
    pub members: Vec<ProjectMember>,
    pub timeline: ProjectTimeline,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberStatus {
    pub member: ProjectMember,
    pub status: MilestoneStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectProgress {
    pub completed: usize,
    pub total: usize,
}

pub struct InterCommunityCoordinator {
    registry: Arc<ProposalRegistry>,
    engine: Arc<ExecutionEngine>,
    projects: RwLock<BTreeMap<ProjectId, CrossCommunityProject>>,
}

impl InterCommunityCoordinator {
    pub fn new(registry: Arc<ProposalRegistry>, engine: Arc<ExecutionEngine>) -> Self {
        Self {
            registry,
            engine,
            projects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn create_project(
        &self,
        name: &str,
        proposals: Vec<ProposalId>,
        timeline: ProjectTimeline,
        now: Timestamp,
    ) -> Result<CrossCommunityProject, ExecutionError> {
        if name.trim().is_empty() {
            return Err(ExecutionError::Validation("project name is empty".into()));
        }
        if proposals.is_empty() {
            return Err(ExecutionError::Validation("project has no members".into()));
        }
        if timeline.starts_at >= timeline.ends_at {
            return Err(ExecutionError::Validation(
                "project timeline must end after it starts".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        let mut members = Vec::with_capacity(proposals.len());
        for id in proposals {
            if !seen.insert(id) {
                return Err(ExecutionError::Validation(format!("duplicate member {id}")));
            }
            let proposal = self.registry.get(&id).map_err(|e| match e {
                GovernanceError::ProposalNotFound(id) => {
                    ExecutionError::Validation(format!("member {id} does not exist"))
                }
                other => other.into(),
            })?;
            members.push(ProjectMember {
                community: proposal.community,
                proposal_id: id,
            });
        }

        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        let id = ProjectId(projects.keys().next_back().map_or(1, |last| last.0 + 1));
        let project = CrossCommunityProject {
            id,
            name: name.trim().to_string(),
            members,
            timeline,
            created_at: now,
        };
        tracing::info!(project = %id, members = project.members.len(), "project created");
        projects.insert(id, project.clone());
        Ok(project)
    }

    pub fn get(&self, id: ProjectId) -> Result<CrossCommunityProject, ExecutionError> {
        self.projects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| ExecutionError::ProjectNotFound(id.to_string()))
    }

    fn member_status(&self, member: &ProjectMember) -> Result<MilestoneStatus, ExecutionError> {
        if self.engine.has_run(&member.proposal_id) {
            return Ok(self.engine.deliverable_status(&member.proposal_id)?.overall);
        }
        let proposal = self.registry.get(&member.proposal_id)?;
        Ok(match proposal.state {
            ProposalState::Completed => MilestoneStatus::Completed,
            ProposalState::Failed | ProposalState::Rejected | ProposalState::Withdrawn => {
                MilestoneStatus::Blocked
            }
            _ => MilestoneStatus::Pending,
        })
    }

    pub fn member_statuses(&self, id: ProjectId) -> Result<Vec<MemberStatus>, ExecutionError> {
        let project = self.get(id)?;
        project
            .members
            .into_iter()
            .map(|member| {
                let status = self.member_status(&member)?;
                Ok(MemberStatus { member, status })
            })
            .collect()
    }

    /// `Completed` once every member has completed, `Blocked` if any member
    /// is blocked or failed, `InProgress` otherwise.
    pub fn aggregate_status(&self, id: ProjectId) -> Result<MilestoneStatus, ExecutionError> {
        let statuses = self.member_statuses(id)?;
        let status = if statuses.iter().all(|m| m.status == MilestoneStatus::Completed) {
            MilestoneStatus::Completed
        } else if statuses.iter().any(|m| m.status == MilestoneStatus::Blocked) {
            MilestoneStatus::Blocked
        } else {
            MilestoneStatus::InProgress
        };
        Ok(status)
    }

    pub fn progress(&self, id: ProjectId) -> Result<ProjectProgress, ExecutionError> {
        let statuses = self.member_statuses(id)?;
        Ok(ProjectProgress {
            completed: statuses
                .iter()
                .filter(|m| m.status == MilestoneStatus::Completed)
                .count(),
            total: statuses.len(),
        })
    }

    pub fn projects_for_community(&self, community: &CommunityId) -> Vec<CrossCommunityProject> {
        self.projects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| p.members.iter().any(|m| &m.community == community))
            .cloned()
            .collect()
    }
}
