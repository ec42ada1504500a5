//! Domain model for employees, contacts and projects.
//!
//! # Responsibility
//! - Define the three entity records and their business keys.
//! - Define the static association declaration table.
//! - Provide graph read/write models built from id-indexed entities.
//!
//! # Invariants
//! - Entities carry no back-pointers; associations are edges keyed by id.
//! - Equality follows the two-tier identity policy: ids when both sides are
//!   persisted, business keys when neither is.

pub mod association;
pub mod contact;
pub mod employee;
pub mod graph;
pub mod project;
