//! Execution plans: ordered phases forming a dependency DAG.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use concord_types::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhaseId(String);

impl PhaseId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhaseId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One unit of execution work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    pub estimated_duration_days: u32,
    /// Agents allowed to mark this phase's criteria satisfied.
    pub responsible_agents: BTreeSet<Identity>,
    pub completion_criteria: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<PhaseId>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("execution plan has no phases")]
    Empty,
    #[error("execution plan has {count} phases, limit is {max}")]
    TooManyPhases { count: usize, max: usize },
    #[error("phase id {0} is used twice")]
    DuplicatePhase(PhaseId),
    #[error("phase has an empty id or name")]
    Unnamed,
    #[error("phase {phase} depends on unknown phase {dependency}")]
    UnknownDependency { phase: PhaseId, dependency: PhaseId },
    #[error("phase {0} depends on itself")]
    SelfDependency(PhaseId),
    #[error("phase dependencies form a cycle through {0:?}")]
    Cycle(Vec<PhaseId>),
    #[error("phase {0} has no completion criteria")]
    MissingCriteria(PhaseId),
    #[error("phase {0} lists a completion criterion twice")]
    DuplicateCriterion(PhaseId),
    #[error("phase {0} has no responsible agents")]
    MissingResponsible(PhaseId),
    #[error("phase {0} has zero estimated duration")]
    ZeroDuration(PhaseId),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub phases: Vec<Phase>,
}

impl ExecutionPlan {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    pub fn phase(&self, id: &PhaseId) -> Option<&Phase> {
        self.phases.iter().find(|p| &p.id == id)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Phases that list `id` as a dependency.
    pub fn dependents<'a>(&'a self, id: &'a PhaseId) -> impl Iterator<Item = &'a Phase> + 'a {
        self.phases.iter().filter(move |p| p.dependencies.contains(id))
    }

    pub fn validate(&self, max_phases: usize) -> Result<(), PlanError> {
        if self.phases.is_empty() {
            return Err(PlanError::Empty);
        }
        if self.phases.len() > max_phases {
            return Err(PlanError::TooManyPhases {
                count: self.phases.len(),
                max: max_phases,
            });
        }

        let mut seen = HashSet::with_capacity(self.phases.len());
        for phase in &self.phases {
            if phase.id.as_str().trim().is_empty() || phase.name.trim().is_empty() {
                return Err(PlanError::Unnamed);
            }
            if !seen.insert(&phase.id) {
                return Err(PlanError::DuplicatePhase(phase.id.clone()));
            }
            if phase.completion_criteria.is_empty()
                || phase.completion_criteria.iter().any(|c| c.trim().is_empty())
            {
                return Err(PlanError::MissingCriteria(phase.id.clone()));
            }
            let distinct: HashSet<_> = phase.completion_criteria.iter().collect();
            if distinct.len() != phase.completion_criteria.len() {
                return Err(PlanError::DuplicateCriterion(phase.id.clone()));
            }
            if phase.responsible_agents.is_empty() {
                return Err(PlanError::MissingResponsible(phase.id.clone()));
            }
            if phase.estimated_duration_days == 0 {
                return Err(PlanError::ZeroDuration(phase.id.clone()));
            }
        }

        for phase in &self.phases {
            for dep in &phase.dependencies {
                if dep == &phase.id {
                    return Err(PlanError::SelfDependency(phase.id.clone()));
                }
                if !seen.contains(dep) {
                    return Err(PlanError::UnknownDependency {
                        phase: phase.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        self.topological_order().map(|_| ())
    }

    /// Kahn's algorithm, ties broken by plan order so the result is stable.
    pub fn topological_order(&self) -> Result<Vec<PhaseId>, PlanError> {
        let index: HashMap<&PhaseId, usize> = self
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| (&p.id, i))
            .collect();

        let mut indegree = vec![0usize; self.phases.len()];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); self.phases.len()];
        for (i, phase) in self.phases.iter().enumerate() {
            for dep in &phase.dependencies {
                let Some(&d) = index.get(dep) else {
                    return Err(PlanError::UnknownDependency {
                        phase: phase.id.clone(),
                        dependency: dep.clone(),
                    });
                };
                edges[d].push(i);
                indegree[i] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..self.phases.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.phases.len());
        while let Some(i) = ready.pop_front() {
            order.push(self.phases[i].id.clone());
            for &next in &edges[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() != self.phases.len() {
            let stuck = (0..self.phases.len())
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.phases[i].id.clone())
                .collect();
            return Err(PlanError::Cycle(stuck));
        }
        Ok(order)
    }
}
