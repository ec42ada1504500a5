//! Relationship consistency rules.
//!
//! # Responsibility
//! - Keep both sides of the employee/contact and employee/project
//!   associations in agreement, as pure operations over id-keyed records.
//! - Encode orphan removal and decoupling as explicit results instead of
//!   side effects.
//!
//! # Invariants
//! - No function here touches storage; the unit of work loads records, runs a
//!   rule, and flushes the returned changes.

pub mod contact_links;
pub mod project_links;
