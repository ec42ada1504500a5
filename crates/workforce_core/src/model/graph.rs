//! Entity graphs: one root entity plus its initialized associations.
//!
//! # Responsibility
//! - Hold an employee together with its owned contacts and linked projects,
//!   for cascading create/merge and for eager reads.
//! - Hold a project together with its linked employees for reads.
//!
//! # Invariants
//! - Contacts inside an `EmployeeGraph` always point at the graph's employee
//!   (`employee_id == employee.id`).
//! - Sets are hash-based and rely on the business-key hash, so transient
//!   members stay reachable after the store assigns identifiers.
//! - Persisted members are matched by identifier only: a persisted id is
//!   present at most once, whatever fields the member carries.

use crate::model::contact::{Contact, ContactId};
use crate::model::employee::Employee;
use crate::model::project::{Project, ProjectId};
use std::collections::{BTreeSet, HashSet};

/// Employee aggregate used for cascading writes and eager reads.
#[derive(Debug, Clone)]
pub struct EmployeeGraph {
    employee: Employee,
    contacts: HashSet<Contact>,
    projects: HashSet<Project>,
    /// Persisted projects linked by id only; their fields are never merged.
    project_links: BTreeSet<ProjectId>,
}

impl EmployeeGraph {
    pub fn new(employee: Employee) -> Self {
        Self {
            employee,
            contacts: HashSet::new(),
            projects: HashSet::new(),
            project_links: BTreeSet::new(),
        }
    }

    pub(crate) fn from_parts(
        employee: Employee,
        contacts: impl IntoIterator<Item = Contact>,
        projects: impl IntoIterator<Item = Project>,
    ) -> Self {
        let mut graph = Self::new(employee);
        for contact in contacts {
            graph.add_contact(contact);
        }
        for project in projects {
            graph.add_project(project);
        }
        graph
    }

    pub fn employee(&self) -> &Employee {
        &self.employee
    }

    /// Field access for updates. The identifier is not meant to be edited.
    pub fn employee_mut(&mut self) -> &mut Employee {
        &mut self.employee
    }

    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter()
    }

    /// Projects carried with their fields, transient ones included.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    /// Project ids linked through [`Self::link_project_id`].
    pub fn linked_project_ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.project_links.iter().copied()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len() + self.project_links.len()
    }

    /// Attaches `contact` to this employee.
    ///
    /// Returns `false` when an equal contact is already attached, or a
    /// contact with the same id.
    pub fn add_contact(&mut self, mut contact: Contact) -> bool {
        if let Some(id) = contact.id {
            if self.contacts.iter().any(|member| member.id == Some(id)) {
                return false;
            }
        }
        contact.employee_id = self.employee.id;
        self.contacts.insert(contact)
    }

    /// Detaches `contact` and returns it unowned.
    ///
    /// Persisted contacts are matched by id. A detached persisted contact is
    /// deleted when the graph is merged.
    pub fn remove_contact(&mut self, contact: &Contact) -> Option<Contact> {
        let mut removed = match contact.id {
            Some(id) => self.take_contact_by_id(id)?,
            None => self.contacts.take(contact)?,
        };
        removed.employee_id = None;
        Some(removed)
    }

    /// Detaches the persisted contact with `contact_id`.
    pub fn remove_contact_by_id(&mut self, contact_id: ContactId) -> Option<Contact> {
        let mut removed = self.take_contact_by_id(contact_id)?;
        removed.employee_id = None;
        Some(removed)
    }

    fn take_contact_by_id(&mut self, contact_id: ContactId) -> Option<Contact> {
        let found = self
            .contacts
            .iter()
            .find(|contact| contact.id == Some(contact_id))?
            .clone();
        self.contacts.take(&found)
    }

    pub fn has_contact(&self, contact: &Contact) -> bool {
        match contact.id {
            Some(id) => self.contacts.iter().any(|member| member.id == Some(id)),
            None => self.contacts.contains(contact),
        }
    }

    /// Adds `project`. Transient projects are persisted on save and
    /// persisted ones merged.
    ///
    /// Returns `false` when the project, or its id, is already linked.
    pub fn add_project(&mut self, project: Project) -> bool {
        if let Some(id) = project.id {
            if self.has_project_id(id) {
                return false;
            }
        }
        self.projects.insert(project)
    }

    /// Links an already persisted project by id without carrying its fields.
    ///
    /// Returns `false` when the id is already linked.
    pub fn link_project_id(&mut self, project_id: ProjectId) -> bool {
        if self.has_project_id(project_id) {
            return false;
        }
        self.project_links.insert(project_id)
    }

    /// Unlinks `project`; persisted projects are matched by id.
    pub fn remove_project(&mut self, project: &Project) -> bool {
        match project.id {
            Some(id) => self.remove_project_by_id(id),
            None => self.projects.remove(project),
        }
    }

    /// Unlinks by identifier, regardless of how the member was added.
    pub fn remove_project_by_id(&mut self, project_id: ProjectId) -> bool {
        let before = self.project_count();
        self.projects.retain(|project| project.id != Some(project_id));
        self.project_links.remove(&project_id);
        self.project_count() != before
    }

    pub fn has_project_id(&self, project_id: ProjectId) -> bool {
        self.project_links.contains(&project_id)
            || self
                .projects
                .iter()
                .any(|project| project.id == Some(project_id))
    }

    /// Identifiers of linked projects that are already persisted.
    pub fn project_ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self
            .projects
            .iter()
            .filter_map(|project| project.id)
            .chain(self.project_links.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Project with its linked employees initialized.
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    project: Project,
    employees: HashSet<Employee>,
}

impl ProjectGraph {
    pub(crate) fn from_parts(project: Project, employees: impl IntoIterator<Item = Employee>) -> Self {
        Self {
            project,
            employees: employees.into_iter().collect(),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter()
    }

    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }

    pub fn has_employee(&self, employee: &Employee) -> bool {
        self.employees.contains(employee)
    }
}
