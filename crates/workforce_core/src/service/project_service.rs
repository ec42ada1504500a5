//! Project use-case service.
//!
//! # Responsibility
//! - Create and update projects.
//! - Link, unlink and replace employee/project edges from the owning side.
//! - Load a project together with its employees.
//!
//! # Invariants
//! - Edge mutations go through `ProjectLinks`, so both sides stay consistent.
//! - `replace_project_links` touches only the symmetric difference.
//! - Unknown project ids follow the store's `ReferencePolicy`.

use crate::db::Store;
use crate::model::association::EntityKind;
use crate::model::employee::{Employee, EmployeeId};
use crate::model::graph::ProjectGraph;
use crate::model::project::{Project, ProjectId};
use crate::relation::project_links::{LinkDiff, ProjectEdge};
use crate::repo::entity_repo::load_association_in;
use crate::repo::error::RepoResult;
use crate::repo::unit_of_work::UnitOfWork;
use log::{info, warn};
use std::collections::BTreeSet;

/// Result of `ProjectService::replace_project_links`, as project ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub added: Vec<ProjectId>,
    pub removed: Vec<ProjectId>,
    pub retained: Vec<ProjectId>,
    /// Requested ids that did not resolve and were skipped.
    pub skipped: Vec<ProjectId>,
}

impl ReplaceOutcome {
    fn from_diff(diff: &LinkDiff, skipped: Vec<ProjectId>) -> Self {
        fn project_ids(edges: &[ProjectEdge]) -> Vec<ProjectId> {
            edges.iter().map(|edge| edge.project_id).collect()
        }
        Self {
            added: project_ids(&diff.added),
            removed: project_ids(&diff.removed),
            retained: project_ids(&diff.retained),
            skipped,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct ProjectService<'store> {
    store: &'store Store,
}

impl<'store> ProjectService<'store> {
    pub fn new(store: &'store Store) -> Self {
        Self { store }
    }

    pub fn add_project(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> RepoResult<Project> {
        let project = Project::new(name, description, status);
        let created = self
            .store
            .unit_of_work("project.add", |uow| uow.insert(&project))?;
        info!(
            "event=project_add module=service status=ok id={}",
            created.id.unwrap_or_default()
        );
        Ok(created)
    }

    /// Replaces every field of project `id`; `None` when it does not exist.
    pub fn update_project(
        &self,
        id: ProjectId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> RepoResult<Option<Project>> {
        let mut replacement = Project::new(name, description, status);
        replacement.id = Some(id);
        let updated = self
            .store
            .unit_of_work("project.update", |uow| uow.update(&replacement))?;
        if updated {
            info!("event=project_update module=service status=ok id={id}");
            Ok(Some(replacement))
        } else {
            warn!("event=project_update module=service status=not_found id={id}");
            Ok(None)
        }
    }

    pub fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        self.store
            .unit_of_work("project.get", |uow| uow.fetch::<Project>(id))
    }

    /// Deletes the project and decouples its employees, who survive.
    pub fn delete_project(&self, id: ProjectId) -> RepoResult<bool> {
        let deleted = self.store.unit_of_work("project.delete", |uow| {
            uow.delete_cascading(EntityKind::Project, id)
        })?;
        if deleted {
            info!("event=project_delete module=service status=ok id={id}");
        } else {
            warn!("event=project_delete module=service status=not_found id={id}");
        }
        Ok(deleted)
    }

    /// Adds the edge `(employee_id, project_id)`.
    ///
    /// `None` when either side does not exist, `Some(false)` when the edge
    /// was already there.
    pub fn link_project(
        &self,
        employee_id: EmployeeId,
        project_id: ProjectId,
    ) -> RepoResult<Option<bool>> {
        let changed = self.store.unit_of_work("project.link", |uow| {
            if !endpoints_exist(uow, employee_id, project_id)? {
                return Ok(None);
            }
            let mut links = uow.project_links_of_employee(employee_id)?;
            let mut diff = LinkDiff::default();
            if links.link(employee_id, project_id) {
                diff.added.push(ProjectEdge::new(employee_id, project_id));
            }
            uow.flush_link_diff(&diff)?;
            Ok(Some(!diff.is_empty()))
        })?;
        log_edge_change("project_link", employee_id, project_id, changed);
        Ok(changed)
    }

    /// Removes the edge `(employee_id, project_id)`. Neither entity is
    /// deleted.
    pub fn unlink_project(
        &self,
        employee_id: EmployeeId,
        project_id: ProjectId,
    ) -> RepoResult<Option<bool>> {
        let changed = self.store.unit_of_work("project.unlink", |uow| {
            if !endpoints_exist(uow, employee_id, project_id)? {
                return Ok(None);
            }
            let mut links = uow.project_links_of_employee(employee_id)?;
            let mut diff = LinkDiff::default();
            if links.unlink(employee_id, project_id) {
                diff.removed.push(ProjectEdge::new(employee_id, project_id));
            }
            uow.flush_link_diff(&diff)?;
            Ok(Some(!diff.is_empty()))
        })?;
        log_edge_change("project_unlink", employee_id, project_id, changed);
        Ok(changed)
    }

    /// Makes `project_ids` the exact project set of `employee_id`.
    ///
    /// Returns `None` when the employee does not exist. Unknown project ids
    /// are reported in `skipped`, or fail the call under
    /// `ReferencePolicy::Reject`.
    pub fn replace_project_links(
        &self,
        employee_id: EmployeeId,
        project_ids: &[ProjectId],
    ) -> RepoResult<Option<ReplaceOutcome>> {
        let outcome = self.store.unit_of_work("project.replace_links", |uow| {
            if !uow.exists(EntityKind::Employee, employee_id)? {
                return Ok(None);
            }
            let (target, skipped) = resolve_project_ids(uow, project_ids.iter().copied())?;
            let mut links = uow.project_links_of_employee(employee_id)?;
            let diff = links.replace_for_employee(employee_id, &target);
            uow.flush_link_diff(&diff)?;
            Ok(Some(ReplaceOutcome::from_diff(&diff, skipped)))
        })?;

        match &outcome {
            Some(outcome) => info!(
                "event=project_replace_links module=service status=ok employee_id={employee_id} added={} removed={} retained={} skipped={}",
                outcome.added.len(),
                outcome.removed.len(),
                outcome.retained.len(),
                outcome.skipped.len()
            ),
            None => warn!(
                "event=project_replace_links module=service status=not_found employee_id={employee_id}"
            ),
        }
        Ok(outcome)
    }

    /// Loads a project with its eager associations initialized.
    pub fn load_project_graph(&self, id: ProjectId) -> RepoResult<Option<ProjectGraph>> {
        self.store.unit_of_work("project.load_graph", |uow| {
            let Some(project) = uow.fetch::<Project>(id)? else {
                return Ok(None);
            };
            let mut employees = Vec::new();
            for association in EntityKind::Project.eager_associations() {
                if association.target == EntityKind::Employee {
                    employees = load_association_in::<Employee>(uow, association, id)?;
                }
            }
            Ok(Some(ProjectGraph::from_parts(project, employees)))
        })
    }
}

/// Splits requested project ids into resolvable ones and skipped ones.
pub(crate) fn resolve_project_ids(
    uow: &UnitOfWork<'_>,
    requested: impl IntoIterator<Item = ProjectId>,
) -> RepoResult<(BTreeSet<ProjectId>, Vec<ProjectId>)> {
    let mut resolved = BTreeSet::new();
    let mut skipped = Vec::new();
    for project_id in requested {
        if resolved.contains(&project_id) {
            continue;
        }
        if uow.resolve_reference(EntityKind::Project, project_id)? {
            resolved.insert(project_id);
        } else if !skipped.contains(&project_id) {
            skipped.push(project_id);
        }
    }
    Ok((resolved, skipped))
}

fn endpoints_exist(
    uow: &UnitOfWork<'_>,
    employee_id: EmployeeId,
    project_id: ProjectId,
) -> RepoResult<bool> {
    Ok(uow.exists(EntityKind::Employee, employee_id)?
        && uow.exists(EntityKind::Project, project_id)?)
}

fn log_edge_change(
    event: &str,
    employee_id: EmployeeId,
    project_id: ProjectId,
    changed: Option<bool>,
) {
    match changed {
        Some(changed) => info!(
            "event={event} module=service status=ok employee_id={employee_id} project_id={project_id} changed={changed}"
        ),
        None => warn!(
            "event={event} module=service status=not_found employee_id={employee_id} project_id={project_id}"
        ),
    }
}
