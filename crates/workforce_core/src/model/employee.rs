//! Employee domain model.
//!
//! # Responsibility
//! - Define the employee record and its business key.
//! - Implement the two-tier identity policy for employees.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one on first save.
//! - Hashing uses only `(first_name, last_name)`, never `id`.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Store-assigned employee identifier.
pub type EmployeeId = i64;

/// Employee row: owner of contacts and owning side of project links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Absent while transient.
    pub id: Option<EmployeeId>,
    pub first_name: String,
    pub last_name: String,
    pub salary: i32,
}

impl Employee {
    /// Creates a transient employee.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, salary: i32) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            salary,
        }
    }

    /// Returns whether the employee has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Business key used before an identifier exists.
    pub fn business_key(&self) -> (&str, &str) {
        (self.first_name.as_str(), self.last_name.as_str())
    }

    /// Compares every stored field, identifier included.
    ///
    /// `==` answers "same logical row"; this answers "same field values".
    pub fn same_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.salary == other.salary
    }
}

impl PartialEq for Employee {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            (None, None) => self.business_key() == other.business_key(),
            _ => false,
        }
    }
}

impl Eq for Employee {}

impl Hash for Employee {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.business_key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::Employee;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    #[test]
    fn transient_employees_compare_by_name() {
        let a = Employee::new("Joan", "Garcia", 35000);
        let b = Employee::new("Joan", "Garcia", 99000);
        let c = Employee::new("Joan", "Ferrer", 35000);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn persisted_employees_compare_by_id_only() {
        let mut a = Employee::new("Joan", "Garcia", 35000);
        let mut b = Employee::new("Marta", "Ferrer", 42000);
        a.id = Some(7);
        b.id = Some(7);
        assert_eq!(a, b);

        b.id = Some(8);
        assert_ne!(a, b);
    }

    #[test]
    fn transient_never_equals_persisted() {
        let transient = Employee::new("Joan", "Garcia", 35000);
        let mut persisted = transient.clone();
        persisted.id = Some(1);
        assert_ne!(transient, persisted);
    }

    #[test]
    fn hash_is_stable_across_id_assignment() {
        let transient = Employee::new("Joan", "Garcia", 35000);
        let mut persisted = transient.clone();
        persisted.id = Some(1);
        assert_eq!(hash_of(&transient), hash_of(&persisted));
    }

    #[test]
    fn hash_set_keeps_one_entry_per_transient_business_key() {
        let mut set = HashSet::new();
        assert!(set.insert(Employee::new("Joan", "Garcia", 35000)));
        assert!(!set.insert(Employee::new("Joan", "Garcia", 1)));
        assert!(set.insert(Employee::new("Laia", "Puig", 45000)));
        assert_eq!(set.len(), 2);
    }

    fn hash_of(employee: &Employee) -> u64 {
        let mut hasher = DefaultHasher::new();
        employee.hash(&mut hasher);
        hasher.finish()
    }
}
