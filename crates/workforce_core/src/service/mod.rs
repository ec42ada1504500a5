//! Use-case services over the shared store.
//!
//! # Responsibility
//! - Expose the relationship-preserving operations callers use day to day.
//! - Run each operation as one unit of work and log its outcome.
//!
//! # Invariants
//! - Employee/project edges are only mutated from the employee side.
//! - A missing target id is reported as `None`/`false` and logged at warn.

pub mod contact_service;
pub mod employee_service;
pub mod project_service;

pub use contact_service::ContactService;
pub use employee_service::{EmployeeService, GraphSaveOutcome};
pub use project_service::{ProjectService, ReplaceOutcome};
