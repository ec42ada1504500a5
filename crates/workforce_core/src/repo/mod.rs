//! Repository layer: unit of work, row mapping and the generic repository.
//!
//! # Responsibility
//! - Wrap every public operation in one transaction scope.
//! - Map entity kinds to SQL from their declared columns and associations.
//! - Classify engine failures into typed repository errors.
//!
//! # Invariants
//! - Repository APIs report missing ids as `None`/`false`, never as errors.
//! - Any error returned from a unit of work means it was rolled back.

pub mod entity;
pub mod entity_repo;
pub mod error;
pub mod unit_of_work;

pub use entity::Entity;
pub use entity_repo::{EntityRepository, FieldFilter, ListQuery, OrderBy, SortDirection};
pub use error::{RepoError, RepoResult};
pub use unit_of_work::{TransactionState, UnitOfWork};
