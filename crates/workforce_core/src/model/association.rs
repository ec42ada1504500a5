//! Static association declarations.
//!
//! # Responsibility
//! - Declare, per entity kind, which associations exist and how lifecycle
//!   operations propagate across them.
//! - Give the repository one table to consult for cascading delete, graph
//!   loading and association joins.
//!
//! # Invariants
//! - Each `(source, name)` pair appears once.
//! - Many-to-many associations never cascade removal to the other entity.
//! - Every association declared on one side has its mirror on the other side.

use std::fmt::{Display, Formatter};

/// Persisted entity kinds managed by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Employee,
    Contact,
    Project,
}

impl EntityKind {
    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Employee => "employees",
            Self::Contact => "contacts",
            Self::Project => "projects",
        }
    }

    /// Non-identifier columns in insert/select order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Employee => &["first_name", "last_name", "salary"],
            Self::Contact => &["contact_type", "value", "description", "employee_id"],
            Self::Project => &["name", "description", "status"],
        }
    }

    /// Returns whether `field` is `id` or one of [`Self::columns`].
    pub fn has_field(self, field: &str) -> bool {
        field == "id" || self.columns().contains(&field)
    }

    /// Associations declared with this kind as source.
    pub fn associations(self) -> impl Iterator<Item = &'static Association> {
        ASSOCIATIONS
            .iter()
            .filter(move |association| association.source == self)
    }

    /// Associations initialized when a graph rooted at this kind is loaded.
    pub fn eager_associations(self) -> impl Iterator<Item = &'static Association> {
        self.associations()
            .filter(|association| association.fetch == FetchMode::Eager)
    }

    /// Looks up one association by name.
    pub fn association(self, name: &str) -> Option<&'static Association> {
        self.associations()
            .find(|association| association.name == name)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Employee => write!(f, "employee"),
            Self::Contact => write!(f, "contact"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// How two entity tables are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Target rows carry `fk_column` pointing at the source id.
    OneToMany { fk_column: &'static str },
    /// Source row carries `fk_column` pointing at the target id.
    ManyToOne { fk_column: &'static str },
    /// Edges live in a join table shared by both sides.
    ManyToMany { join: &'static JoinTable },
}

/// Join table of a many-to-many association, described from the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinTable {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub inverse_column: &'static str,
}

/// Edge table of the employee/project association.
pub static EMPLOYEE_PROJECT_JOIN: JoinTable = JoinTable {
    table: "employee_project",
    owner_column: "employee_id",
    inverse_column: "project_id",
};

/// Foreign key column on `contacts` pointing at the owning employee.
pub const CONTACT_OWNER_COLUMN: &str = "employee_id";

/// Which side of the association issues authoritative mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Owning,
    Inverse,
}

/// Whether a loaded graph initializes the association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Reachable through association lookups only.
    Lazy,
    /// Loaded together with the source entity's graph.
    Eager,
}

/// Lifecycle operations propagated from source to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePolicy {
    /// Saving a graph inserts its transient targets.
    pub persist: bool,
    /// Saving a graph writes the fields of its persisted targets.
    pub merge: bool,
    /// Deleting the source deletes its targets.
    pub remove: bool,
}

impl CascadePolicy {
    pub const ALL: Self = Self {
        persist: true,
        merge: true,
        remove: true,
    };
    pub const PERSIST_MERGE: Self = Self {
        persist: true,
        merge: true,
        remove: false,
    };
    pub const NONE: Self = Self {
        persist: false,
        merge: false,
        remove: false,
    };
}

/// One declared association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub source: EntityKind,
    pub name: &'static str,
    pub target: EntityKind,
    pub kind: AssociationKind,
    pub side: Side,
    pub cascade: CascadePolicy,
    /// Detaching a target from the source deletes the target.
    pub orphan_removal: bool,
    pub fetch: FetchMode,
}

impl Association {
    /// `(table, source_column, target_column)` for many-to-many associations.
    pub fn join_columns(&self) -> Option<(&'static str, &'static str, &'static str)> {
        match self.kind {
            AssociationKind::ManyToMany { join } => Some(match self.side {
                Side::Owning => (join.table, join.owner_column, join.inverse_column),
                Side::Inverse => (join.table, join.inverse_column, join.owner_column),
            }),
            _ => None,
        }
    }
}

pub const EMPLOYEE_CONTACTS: &str = "contacts";
pub const EMPLOYEE_PROJECTS: &str = "projects";
pub const CONTACT_EMPLOYEE: &str = "employee";
pub const PROJECT_EMPLOYEES: &str = "employees";

/// The full declaration table.
pub static ASSOCIATIONS: &[Association] = &[
    Association {
        source: EntityKind::Employee,
        name: EMPLOYEE_CONTACTS,
        target: EntityKind::Contact,
        kind: AssociationKind::OneToMany {
            fk_column: CONTACT_OWNER_COLUMN,
        },
        side: Side::Owning,
        cascade: CascadePolicy::ALL,
        orphan_removal: true,
        fetch: FetchMode::Eager,
    },
    Association {
        source: EntityKind::Employee,
        name: EMPLOYEE_PROJECTS,
        target: EntityKind::Project,
        kind: AssociationKind::ManyToMany {
            join: &EMPLOYEE_PROJECT_JOIN,
        },
        side: Side::Owning,
        cascade: CascadePolicy::PERSIST_MERGE,
        orphan_removal: false,
        fetch: FetchMode::Eager,
    },
    Association {
        source: EntityKind::Contact,
        name: CONTACT_EMPLOYEE,
        target: EntityKind::Employee,
        kind: AssociationKind::ManyToOne {
            fk_column: CONTACT_OWNER_COLUMN,
        },
        side: Side::Inverse,
        cascade: CascadePolicy::NONE,
        orphan_removal: false,
        fetch: FetchMode::Lazy,
    },
    Association {
        source: EntityKind::Project,
        name: PROJECT_EMPLOYEES,
        target: EntityKind::Employee,
        kind: AssociationKind::ManyToMany {
            join: &EMPLOYEE_PROJECT_JOIN,
        },
        side: Side::Inverse,
        cascade: CascadePolicy::NONE,
        orphan_removal: false,
        fetch: FetchMode::Eager,
    },
];

#[cfg(test)]
mod tests {
    use super::{AssociationKind, EntityKind, Side, ASSOCIATIONS};
    use std::collections::HashSet;

    #[test]
    fn association_names_are_unique_per_source() {
        let mut seen = HashSet::new();
        for association in ASSOCIATIONS {
            assert!(seen.insert((association.source, association.name)));
        }
    }

    #[test]
    fn many_to_many_never_cascades_remove() {
        for association in ASSOCIATIONS {
            if matches!(association.kind, AssociationKind::ManyToMany { .. }) {
                assert!(!association.cascade.remove, "{}", association.name);
            }
        }
    }

    #[test]
    fn every_association_has_a_mirror() {
        for association in ASSOCIATIONS {
            let mirrored = association
                .target
                .associations()
                .any(|other| other.target == association.source);
            assert!(mirrored, "{}.{}", association.source, association.name);
        }
    }

    #[test]
    fn employee_owns_both_of_its_associations() {
        for association in EntityKind::Employee.associations() {
            assert_eq!(association.side, Side::Owning);
        }
        assert!(EntityKind::Employee
            .association("contacts")
            .is_some_and(|association| association.orphan_removal));
    }

    #[test]
    fn join_columns_are_oriented_from_the_source() {
        let owning = EntityKind::Employee.association("projects").unwrap();
        let inverse = EntityKind::Project.association("employees").unwrap();
        assert_eq!(
            owning.join_columns(),
            Some(("employee_project", "employee_id", "project_id"))
        );
        assert_eq!(
            inverse.join_columns(),
            Some(("employee_project", "project_id", "employee_id"))
        );
    }

    #[test]
    fn graphs_initialize_collections_but_not_the_owner_reference() {
        let employee: Vec<_> = EntityKind::Employee
            .eager_associations()
            .map(|association| association.name)
            .collect();
        assert_eq!(employee, vec!["contacts", "projects"]);
        assert_eq!(EntityKind::Contact.eager_associations().count(), 0);
        assert_eq!(EntityKind::Project.eager_associations().count(), 1);
    }

    #[test]
    fn has_field_accepts_id_and_declared_columns_only() {
        assert!(EntityKind::Contact.has_field("id"));
        assert!(EntityKind::Contact.has_field("contact_type"));
        assert!(!EntityKind::Contact.has_field("contact_type; DROP TABLE contacts"));
    }
}
