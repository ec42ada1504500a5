//! Employee/project edge set.
//!
//! # Responsibility
//! - Link, unlink and replace employee/project edges in memory.
//! - Report exactly which edges changed so the unit of work can flush them.
//!
//! # Invariants
//! - Both directions are derived from one edge set, so an edge visible from
//!   the employee side is always visible from the project side.
//! - `link`/`unlink` are idempotent.

use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use std::collections::BTreeSet;

/// One association edge, owner first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectEdge {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
}

impl ProjectEdge {
    pub fn new(employee_id: EmployeeId, project_id: ProjectId) -> Self {
        Self {
            employee_id,
            project_id,
        }
    }
}

/// Edge changes produced by a relationship rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDiff {
    pub added: Vec<ProjectEdge>,
    pub removed: Vec<ProjectEdge>,
    pub retained: Vec<ProjectEdge>,
}

impl LinkDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// In-memory edge table for the employee/project association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectLinks {
    edges: BTreeSet<ProjectEdge>,
}

impl ProjectLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges(edges: impl IntoIterator<Item = ProjectEdge>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = &ProjectEdge> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, employee_id: EmployeeId, project_id: ProjectId) -> bool {
        self.edges
            .contains(&ProjectEdge::new(employee_id, project_id))
    }

    /// Adds the edge. Returns `false` when it already existed.
    pub fn link(&mut self, employee_id: EmployeeId, project_id: ProjectId) -> bool {
        self.edges.insert(ProjectEdge::new(employee_id, project_id))
    }

    /// Removes the edge. Returns `false` when it did not exist.
    pub fn unlink(&mut self, employee_id: EmployeeId, project_id: ProjectId) -> bool {
        self.edges.remove(&ProjectEdge::new(employee_id, project_id))
    }

    pub fn projects_of(&self, employee_id: EmployeeId) -> BTreeSet<ProjectId> {
        self.edges
            .iter()
            .filter(|edge| edge.employee_id == employee_id)
            .map(|edge| edge.project_id)
            .collect()
    }

    pub fn employees_of(&self, project_id: ProjectId) -> BTreeSet<EmployeeId> {
        self.edges
            .iter()
            .filter(|edge| edge.project_id == project_id)
            .map(|edge| edge.employee_id)
            .collect()
    }

    /// Removes every edge of `employee_id` and returns them.
    pub fn detach_employee(&mut self, employee_id: EmployeeId) -> Vec<ProjectEdge> {
        self.drain_matching(|edge| edge.employee_id == employee_id)
    }

    /// Removes every edge of `project_id` and returns them.
    pub fn detach_project(&mut self, project_id: ProjectId) -> Vec<ProjectEdge> {
        self.drain_matching(|edge| edge.project_id == project_id)
    }

    /// Makes `target` the exact project set of `employee_id`.
    ///
    /// Only the symmetric difference is touched: edges to projects no longer
    /// present are removed, edges to new projects are added, the rest stay.
    pub fn replace_for_employee(
        &mut self,
        employee_id: EmployeeId,
        target: &BTreeSet<ProjectId>,
    ) -> LinkDiff {
        let current = self.projects_of(employee_id);
        let mut diff = LinkDiff::default();

        for project_id in current.difference(target) {
            self.unlink(employee_id, *project_id);
            diff.removed.push(ProjectEdge::new(employee_id, *project_id));
        }
        for project_id in target.difference(&current) {
            self.link(employee_id, *project_id);
            diff.added.push(ProjectEdge::new(employee_id, *project_id));
        }
        for project_id in current.intersection(target) {
            diff.retained.push(ProjectEdge::new(employee_id, *project_id));
        }

        diff
    }

    fn drain_matching(&mut self, predicate: impl Fn(&ProjectEdge) -> bool) -> Vec<ProjectEdge> {
        let matching: Vec<ProjectEdge> = self.edges.iter().copied().filter(predicate).collect();
        for edge in &matching {
            self.edges.remove(edge);
        }
        matching
    }
}
