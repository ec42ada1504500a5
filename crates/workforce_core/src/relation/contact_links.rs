//! Employee/contact ownership rules.
//!
//! # Responsibility
//! - Track which employee owns which contact as `contact -> owner` records.
//! - Turn detach operations into explicit orphan removals.
//!
//! # Invariants
//! - A contact has at most one owner; relinking moves it.
//! - Unlinking never leaves an unowned contact behind: the result is an
//!   `OrphanRemoval` the unit of work must execute.

use crate::model::contact::ContactId;
use crate::model::employee::EmployeeId;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of `ContactOwnership::link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipChange {
    /// Contact had no owner before.
    Attached {
        contact_id: ContactId,
        employee_id: EmployeeId,
    },
    /// Contact was unlinked from `from` and linked to `to`.
    Moved {
        contact_id: ContactId,
        from: EmployeeId,
        to: EmployeeId,
    },
    /// Contact already belonged to the employee.
    Unchanged,
}

/// A detached contact that must be deleted in the same unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanRemoval {
    pub contact_id: ContactId,
    pub former_owner: EmployeeId,
}

/// Ownership records for a set of contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactOwnership {
    owners: BTreeMap<ContactId, EmployeeId>,
}

impl ContactOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (ContactId, EmployeeId)>) -> Self {
        Self {
            owners: pairs.into_iter().collect(),
        }
    }

    pub fn owner_of(&self, contact_id: ContactId) -> Option<EmployeeId> {
        self.owners.get(&contact_id).copied()
    }

    pub fn contacts_of(&self, employee_id: EmployeeId) -> BTreeSet<ContactId> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == employee_id)
            .map(|(contact_id, _)| *contact_id)
            .collect()
    }

    /// Makes `employee_id` the owner of `contact_id`.
    pub fn link(&mut self, employee_id: EmployeeId, contact_id: ContactId) -> OwnershipChange {
        match self.owners.insert(contact_id, employee_id) {
            None => OwnershipChange::Attached {
                contact_id,
                employee_id,
            },
            Some(previous) if previous == employee_id => OwnershipChange::Unchanged,
            Some(previous) => OwnershipChange::Moved {
                contact_id,
                from: previous,
                to: employee_id,
            },
        }
    }

    /// Detaches `contact_id` from `employee_id`.
    ///
    /// Returns `None` when the contact is not owned by that employee; the
    /// records are left untouched in that case.
    pub fn unlink(&mut self, employee_id: EmployeeId, contact_id: ContactId) -> Option<OrphanRemoval> {
        if self.owner_of(contact_id) != Some(employee_id) {
            return None;
        }
        self.owners.remove(&contact_id);
        Some(OrphanRemoval {
            contact_id,
            former_owner: employee_id,
        })
    }

    /// Detaches every contact of `employee_id` (cascade on employee delete).
    pub fn detach_employee(&mut self, employee_id: EmployeeId) -> Vec<OrphanRemoval> {
        self.retain_for_employee(employee_id, &BTreeSet::new())
    }

    /// Keeps only `keep` among the contacts of `employee_id`; the rest become
    /// orphans.
    pub fn retain_for_employee(
        &mut self,
        employee_id: EmployeeId,
        keep: &BTreeSet<ContactId>,
    ) -> Vec<OrphanRemoval> {
        self.contacts_of(employee_id)
            .difference(keep)
            .filter_map(|contact_id| self.unlink(employee_id, *contact_id))
            .collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContactOwnership, OrphanRemoval, OwnershipChange};
    use std::collections::BTreeSet;

    #[test]
    fn link_attaches_then_reports_unchanged() {
        let mut ownership = ContactOwnership::new();
        assert_eq!(
            ownership.link(1, 5),
            OwnershipChange::Attached {
                contact_id: 5,
                employee_id: 1
            }
        );
        assert_eq!(ownership.link(1, 5), OwnershipChange::Unchanged);
    }

    #[test]
    fn relinking_moves_contact_out_of_previous_owner() {
        let mut ownership = ContactOwnership::from_pairs([(5, 1)]);
        assert_eq!(
            ownership.link(2, 5),
            OwnershipChange::Moved {
                contact_id: 5,
                from: 1,
                to: 2
            }
        );
        assert!(ownership.contacts_of(1).is_empty());
        assert_eq!(ownership.contacts_of(2), BTreeSet::from([5]));
    }

    #[test]
    fn unlink_produces_orphan_removal() {
        let mut ownership = ContactOwnership::from_pairs([(5, 1)]);
        assert_eq!(
            ownership.unlink(1, 5),
            Some(OrphanRemoval {
                contact_id: 5,
                former_owner: 1
            })
        );
        assert_eq!(ownership.owner_of(5), None);
    }

    #[test]
    fn unlink_from_wrong_owner_is_a_no_op() {
        let mut ownership = ContactOwnership::from_pairs([(5, 1)]);
        assert_eq!(ownership.unlink(2, 5), None);
        assert_eq!(ownership.owner_of(5), Some(1));
    }

    #[test]
    fn retain_orphans_only_missing_contacts() {
        let mut ownership = ContactOwnership::from_pairs([(5, 1), (6, 1), (7, 2)]);
        let orphans = ownership.retain_for_employee(1, &BTreeSet::from([6]));
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].contact_id, 5);
        assert_eq!(ownership.contacts_of(1), BTreeSet::from([6]));
        assert_eq!(ownership.owner_of(7), Some(2));
    }

    #[test]
    fn detach_employee_orphans_everything_it_owned() {
        let mut ownership = ContactOwnership::from_pairs([(5, 1), (6, 1)]);
        assert_eq!(ownership.detach_employee(1).len(), 2);
        assert!(ownership.contacts_of(1).is_empty());
    }
}
