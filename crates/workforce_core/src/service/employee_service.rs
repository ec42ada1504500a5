//! Employee use-case service.
//!
//! # Responsibility
//! - Create, update and delete employees with their declared cascades.
//! - Persist and merge whole employee graphs (contacts and project links).
//! - Answer association lookups (by contact type, by project).
//!
//! # Invariants
//! - A graph is saved in one unit of work; a failure leaves nothing behind.
//! - Contacts missing from a merged graph are orphan-deleted.
//! - Projects reached through a graph are linked, never deleted.

use crate::db::Store;
use crate::model::association::{Association, EntityKind, EMPLOYEE_CONTACTS, EMPLOYEE_PROJECTS};
use crate::model::contact::{Contact, ContactId};
use crate::model::employee::{Employee, EmployeeId};
use crate::model::graph::EmployeeGraph;
use crate::model::project::{Project, ProjectId};
use crate::repo::entity::Entity;
use crate::repo::entity_repo::{find_by_associated_in, load_association_in};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::unit_of_work::UnitOfWork;
use crate::service::project_service::resolve_project_ids;
use log::{info, warn};
use rusqlite::types::Value;
use std::collections::BTreeSet;

/// Graph as stored after a save, plus project ids that were skipped.
#[derive(Debug, Clone)]
pub struct GraphSaveOutcome {
    pub graph: EmployeeGraph,
    pub skipped_projects: Vec<ProjectId>,
}

pub struct EmployeeService<'store> {
    store: &'store Store,
}

impl<'store> EmployeeService<'store> {
    pub fn new(store: &'store Store) -> Self {
        Self { store }
    }

    pub fn add_employee(
        &self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        salary: i32,
    ) -> RepoResult<Employee> {
        let employee = Employee::new(first_name, last_name, salary);
        let created = self
            .store
            .unit_of_work("employee.add", |uow| uow.insert(&employee))?;
        info!(
            "event=employee_add module=service status=ok id={}",
            created.id.unwrap_or_default()
        );
        Ok(created)
    }

    /// Replaces the scalar fields of employee `id`; `None` when it does not
    /// exist.
    pub fn update_employee(
        &self,
        id: EmployeeId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        salary: i32,
    ) -> RepoResult<Option<Employee>> {
        let mut replacement = Employee::new(first_name, last_name, salary);
        replacement.id = Some(id);
        let updated = self
            .store
            .unit_of_work("employee.update", |uow| uow.update(&replacement))?;
        if updated {
            info!("event=employee_update module=service status=ok id={id}");
            Ok(Some(replacement))
        } else {
            warn!("event=employee_update module=service status=not_found id={id}");
            Ok(None)
        }
    }

    pub fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        self.store
            .unit_of_work("employee.get", |uow| uow.fetch::<Employee>(id))
    }

    /// Deletes the employee, its contacts and its project links. Projects
    /// survive.
    pub fn delete_employee(&self, id: EmployeeId) -> RepoResult<bool> {
        let deleted = self.store.unit_of_work("employee.delete", |uow| {
            uow.delete_cascading(EntityKind::Employee, id)
        })?;
        if deleted {
            info!("event=employee_delete module=service status=ok id={id}");
        } else {
            warn!("event=employee_delete module=service status=not_found id={id}");
        }
        Ok(deleted)
    }

    /// Persists a transient employee together with its graph.
    ///
    /// What happens to each member follows the employee's association
    /// declarations: transient contacts and projects are inserted under
    /// cascade persist, persisted ones are written under cascade merge, and
    /// contacts are moved to the new employee. Id-only project links are
    /// resolved and linked.
    pub fn create_employee_graph(&self, graph: &EmployeeGraph) -> RepoResult<GraphSaveOutcome> {
        let outcome = self.store.unit_of_work("employee.create_graph", |uow| {
            let employee = uow.insert(graph.employee())?;
            let employee_id = persisted_id(&employee)?;
            save_graph_associations(uow, employee_id, graph)
        })?;
        log_graph_save("employee_create_graph", &outcome);
        Ok(outcome)
    }

    /// Cascades a merge of a persisted employee graph.
    ///
    /// Scalar fields are saved, new contacts inserted, existing ones updated,
    /// contacts absent from the graph orphan-deleted and project links
    /// replaced. A transient root is created instead. Returns `None` when
    /// the root id does not exist.
    pub fn merge_employee_graph(
        &self,
        graph: &EmployeeGraph,
    ) -> RepoResult<Option<GraphSaveOutcome>> {
        let Some(employee_id) = graph.employee().id else {
            return self.create_employee_graph(graph).map(Some);
        };

        let outcome = self.store.unit_of_work("employee.merge_graph", |uow| {
            if !uow.update(graph.employee())? {
                return Ok(None);
            }
            save_graph_associations(uow, employee_id, graph).map(Some)
        })?;

        match &outcome {
            Some(outcome) => log_graph_save("employee_merge_graph", outcome),
            None => warn!(
                "event=employee_merge_graph module=service status=not_found id={employee_id}"
            ),
        }
        Ok(outcome)
    }

    /// Loads an employee with contacts and projects initialized.
    pub fn load_employee_graph(&self, id: EmployeeId) -> RepoResult<Option<EmployeeGraph>> {
        self.store
            .unit_of_work("employee.load_graph", |uow| load_graph_in(uow, id))
    }

    /// Employees owning at least one contact of `contact_type`, ordered by id.
    pub fn find_employees_by_contact_type(&self, contact_type: &str) -> RepoResult<Vec<Employee>> {
        let contact_type = Value::Text(contact_type.to_string());
        self.store.unit_of_work("employee.find_by_contact_type", |uow| {
            find_by_associated_in::<Employee>(
                uow,
                EMPLOYEE_CONTACTS,
                "contact_type",
                contact_type,
            )
        })
    }

    /// Employees linked to `project_id`, ordered by id. Empty when the
    /// project does not exist.
    pub fn find_employees_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Employee>> {
        self.store.unit_of_work("employee.find_by_project", |uow| {
            find_by_associated_in::<Employee>(
                uow,
                EMPLOYEE_PROJECTS,
                "id",
                Value::Integer(project_id),
            )
        })
    }
}

fn save_graph_associations(
    uow: &UnitOfWork<'_>,
    employee_id: EmployeeId,
    graph: &EmployeeGraph,
) -> RepoResult<GraphSaveOutcome> {
    save_contacts(uow, declared(EMPLOYEE_CONTACTS)?, employee_id, graph)?;
    let skipped_projects = save_projects(uow, declared(EMPLOYEE_PROJECTS)?, employee_id, graph)?;

    let graph = load_graph_in(uow, employee_id)?.ok_or_else(|| {
        RepoError::InvalidData(format!("employee {employee_id} missing after graph save"))
    })?;
    Ok(GraphSaveOutcome {
        graph,
        skipped_projects,
    })
}

/// Contacts follow the `contacts` declaration: transient ones need cascade
/// persist, field writes need cascade merge, and contacts left out of the
/// graph are deleted only under orphan removal.
fn save_contacts(
    uow: &UnitOfWork<'_>,
    association: &Association,
    employee_id: EmployeeId,
    graph: &EmployeeGraph,
) -> RepoResult<()> {
    let mut ownership = uow.contact_ownership_of(employee_id)?;
    let mut keep: BTreeSet<ContactId> = BTreeSet::new();

    for contact in graph.contacts() {
        let mut owned = contact.clone();
        owned.employee_id = Some(employee_id);
        match contact.id {
            None => {
                ensure_cascade(association, association.cascade.persist, "persist")?;
                uow.insert(&owned)?;
            }
            Some(contact_id) => {
                if !uow.resolve_reference(EntityKind::Contact, contact_id)? {
                    continue;
                }
                let change = ownership.link(employee_id, contact_id);
                if association.cascade.merge {
                    uow.update(&owned)?;
                } else {
                    uow.flush_ownership_change(change)?;
                }
                keep.insert(contact_id);
            }
        }
    }

    let orphans = ownership.retain_for_employee(employee_id, &keep);
    if orphans.is_empty() {
        return Ok(());
    }
    if !association.orphan_removal {
        return Err(RepoError::ConstraintViolation(format!(
            "{}.{} has no orphan removal; {} detached contact(s) would lose their owner",
            association.source,
            association.name,
            orphans.len()
        )));
    }
    uow.flush_orphan_removals(&orphans)?;
    Ok(())
}

/// Projects follow the `projects` declaration. Id-only links are never
/// merged. Returns the project ids that were skipped.
fn save_projects(
    uow: &UnitOfWork<'_>,
    association: &Association,
    employee_id: EmployeeId,
    graph: &EmployeeGraph,
) -> RepoResult<Vec<ProjectId>> {
    let mut requested = Vec::new();
    for project in graph.projects() {
        match project.id {
            None => {
                ensure_cascade(association, association.cascade.persist, "persist")?;
                requested.push(persisted_id(&uow.insert(project)?)?);
            }
            Some(project_id) => {
                if association.cascade.merge && uow.exists(EntityKind::Project, project_id)? {
                    uow.update(project)?;
                }
                requested.push(project_id);
            }
        }
    }
    requested.extend(graph.linked_project_ids());

    let (target, skipped) = resolve_project_ids(uow, requested)?;
    let mut links = uow.project_links_of_employee(employee_id)?;
    let diff = links.replace_for_employee(employee_id, &target);
    uow.flush_link_diff(&diff)?;
    Ok(skipped)
}

/// Loads the employee with every association declared eager.
fn load_graph_in(uow: &UnitOfWork<'_>, id: EmployeeId) -> RepoResult<Option<EmployeeGraph>> {
    let Some(employee) = uow.fetch::<Employee>(id)? else {
        return Ok(None);
    };
    let mut contacts = Vec::new();
    let mut projects = Vec::new();
    for association in EntityKind::Employee.eager_associations() {
        match association.target {
            EntityKind::Contact => contacts = load_association_in::<Contact>(uow, association, id)?,
            EntityKind::Project => projects = load_association_in::<Project>(uow, association, id)?,
            EntityKind::Employee => {}
        }
    }
    Ok(Some(EmployeeGraph::from_parts(employee, contacts, projects)))
}

fn declared(name: &str) -> RepoResult<&'static Association> {
    EntityKind::Employee
        .association(name)
        .ok_or_else(|| RepoError::UnknownAssociation {
            kind: EntityKind::Employee,
            name: name.to_string(),
        })
}

fn ensure_cascade(association: &Association, enabled: bool, operation: &str) -> RepoResult<()> {
    if enabled {
        Ok(())
    } else {
        Err(RepoError::InvalidData(format!(
            "{}.{} does not cascade {operation} to transient {} rows",
            association.source, association.name, association.target
        )))
    }
}

fn persisted_id<E: Entity>(entity: &E) -> RepoResult<i64> {
    entity
        .id()
        .ok_or_else(|| RepoError::InvalidData(format!("{} insert returned no id", E::KIND)))
}

fn log_graph_save(event: &str, outcome: &GraphSaveOutcome) {
    info!(
        "event={event} module=service status=ok id={} contacts={} projects={} skipped_projects={}",
        outcome.graph.employee().id.unwrap_or_default(),
        outcome.graph.contact_count(),
        outcome.graph.project_count(),
        outcome.skipped_projects.len()
    );
}
