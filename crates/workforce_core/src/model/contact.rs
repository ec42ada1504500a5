//! Contact domain model.
//!
//! # Responsibility
//! - Define the owned contact record (email, phone, address, ...).
//!
//! # Invariants
//! - A persisted contact always has `employee_id = Some(..)`; the store
//!   rejects ownerless rows.
//! - Business key is `(contact_type, value, employee_id)`.

use crate::model::employee::EmployeeId;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Store-assigned contact identifier.
pub type ContactId = i64;

/// Contact detail owned by exactly one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<ContactId>,
    /// Category label such as `EMAIL` or `PHONE`.
    pub contact_type: String,
    pub value: String,
    pub description: Option<String>,
    /// Owning employee. Set through the relationship rules, not by hand.
    pub employee_id: Option<EmployeeId>,
}

impl Contact {
    /// Creates a transient, unowned contact.
    pub fn new(
        contact_type: impl Into<String>,
        value: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: None,
            contact_type: contact_type.into(),
            value: value.into(),
            description,
            employee_id: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn business_key(&self) -> (&str, &str, Option<EmployeeId>) {
        (
            self.contact_type.as_str(),
            self.value.as_str(),
            self.employee_id,
        )
    }

    /// Compares every stored field, identifier and owner included.
    pub fn same_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.contact_type == other.contact_type
            && self.value == other.value
            && self.description == other.description
            && self.employee_id == other.employee_id
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            (None, None) => self.business_key() == other.business_key(),
            _ => false,
        }
    }
}

impl Eq for Contact {}

impl Hash for Contact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.business_key().hash(state);
    }
}
