//! Contact use-case service.
//!
//! # Responsibility
//! - Attach new contacts to an employee and move contacts between owners.
//! - Apply orphan removal when a contact is detached from its owner.
//!
//! # Invariants
//! - A persisted contact always has exactly one owning employee.
//! - `unlink_contact` deletes the contact in the same unit of work.

use crate::db::Store;
use crate::model::association::{EntityKind, EMPLOYEE_CONTACTS};
use crate::model::contact::{Contact, ContactId};
use crate::model::employee::EmployeeId;
use crate::relation::contact_links::{ContactOwnership, OwnershipChange};
use crate::repo::error::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::types::Value;

pub struct ContactService<'store> {
    store: &'store Store,
}

impl<'store> ContactService<'store> {
    pub fn new(store: &'store Store) -> Self {
        Self { store }
    }

    /// Creates a contact owned by `employee_id`.
    ///
    /// Returns `None` when the employee does not exist.
    pub fn add_contact_to_employee(
        &self,
        employee_id: EmployeeId,
        contact_type: impl Into<String>,
        value: impl Into<String>,
        description: Option<String>,
    ) -> RepoResult<Option<Contact>> {
        let mut contact = Contact::new(contact_type, value, description);
        contact.employee_id = Some(employee_id);

        let created = self.store.unit_of_work("contact.add", |uow| {
            if !uow.exists(EntityKind::Employee, employee_id)? {
                return Ok(None);
            }
            uow.insert(&contact).map(Some)
        })?;

        match &created {
            Some(contact) => info!(
                "event=contact_add module=service status=ok id={} employee_id={employee_id}",
                contact.id.unwrap_or_default()
            ),
            None => warn!(
                "event=contact_add module=service status=not_found employee_id={employee_id}"
            ),
        }
        Ok(created)
    }

    /// Makes `employee_id` the owner of an existing contact, detaching it
    /// from its previous owner.
    ///
    /// Returns `None` when either id does not exist.
    pub fn link_contact(
        &self,
        employee_id: EmployeeId,
        contact_id: ContactId,
    ) -> RepoResult<Option<OwnershipChange>> {
        let change = self.store.unit_of_work("contact.link", |uow| {
            if !uow.exists(EntityKind::Employee, employee_id)? {
                return Ok(None);
            }
            let Some(contact) = uow.fetch::<Contact>(contact_id)? else {
                return Ok(None);
            };
            let mut ownership = ContactOwnership::from_pairs(
                contact.employee_id.map(|owner| (contact_id, owner)),
            );
            let change = ownership.link(employee_id, contact_id);
            uow.flush_ownership_change(change)?;
            Ok(Some(change))
        })?;

        match change {
            Some(change) => info!(
                "event=contact_link module=service status=ok contact_id={contact_id} employee_id={employee_id} moved={}",
                matches!(change, OwnershipChange::Moved { .. })
            ),
            None => warn!(
                "event=contact_link module=service status=not_found contact_id={contact_id} employee_id={employee_id}"
            ),
        }
        Ok(change)
    }

    /// Detaches a contact from its owner and deletes it.
    ///
    /// Returns `false` when the contact does not exist or is owned by another
    /// employee; nothing is changed in that case.
    pub fn unlink_contact(&self, employee_id: EmployeeId, contact_id: ContactId) -> RepoResult<bool> {
        let removed = self.store.unit_of_work("contact.unlink", |uow| {
            let mut ownership = uow.contact_ownership_of(employee_id)?;
            let Some(orphan) = ownership.unlink(employee_id, contact_id) else {
                return Ok(false);
            };
            let orphan_removal = EntityKind::Employee
                .association(EMPLOYEE_CONTACTS)
                .is_some_and(|association| association.orphan_removal);
            if !orphan_removal {
                return Err(RepoError::ConstraintViolation(format!(
                    "contact {contact_id} cannot be detached without orphan removal"
                )));
            }
            Ok(uow.flush_orphan_removals(&[orphan])? == 1)
        })?;

        if removed {
            info!(
                "event=contact_unlink module=service status=ok contact_id={contact_id} employee_id={employee_id} orphan_removed=true"
            );
        } else {
            warn!(
                "event=contact_unlink module=service status=not_found contact_id={contact_id} employee_id={employee_id}"
            );
        }
        Ok(removed)
    }

    /// Replaces the detail fields of a contact; the owner is kept.
    pub fn update_contact(
        &self,
        id: ContactId,
        contact_type: impl Into<String>,
        value: impl Into<String>,
        description: Option<String>,
    ) -> RepoResult<Option<Contact>> {
        let contact_type = contact_type.into();
        let value = value.into();
        let updated = self.store.unit_of_work("contact.update", |uow| {
            let Some(mut contact) = uow.fetch::<Contact>(id)? else {
                return Ok(None);
            };
            contact.contact_type = contact_type;
            contact.value = value;
            contact.description = description;
            uow.update(&contact)?;
            Ok(Some(contact))
        })?;

        if updated.is_some() {
            info!("event=contact_update module=service status=ok id={id}");
        } else {
            warn!("event=contact_update module=service status=not_found id={id}");
        }
        Ok(updated)
    }

    pub fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        self.store
            .unit_of_work("contact.get", |uow| uow.fetch::<Contact>(id))
    }

    /// Contacts of `employee_id` with the given type, ordered by id.
    pub fn find_contacts_by_employee_and_type(
        &self,
        employee_id: EmployeeId,
        contact_type: &str,
    ) -> RepoResult<Vec<Contact>> {
        self.store.unit_of_work("contact.find_by_employee_and_type", |uow| {
            uow.select::<Contact>(
                "WHERE e.employee_id = ?1 AND e.contact_type = ?2 ORDER BY e.id ASC",
                vec![
                    Value::Integer(employee_id),
                    Value::Text(contact_type.to_string()),
                ],
            )
        })
    }
}
