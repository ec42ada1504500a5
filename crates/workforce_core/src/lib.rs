//! Employee, contact and project records with relationship-preserving
//! persistence on SQLite.
//!
//! Open one [`Store`] per process, pass it by reference to
//! [`EntityRepository`] and the services, and close it at shutdown.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod relation;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ReferencePolicy, StoreConfig, StoreLocation};
pub use db::{DbError, DbResult, Store};
pub use logging::{default_log_level, init_logging, init_logging_from_env, logging_status};
pub use model::association::EntityKind;
pub use model::contact::{Contact, ContactId};
pub use model::employee::{Employee, EmployeeId};
pub use model::graph::{EmployeeGraph, ProjectGraph};
pub use model::project::{Project, ProjectId};
pub use relation::contact_links::OwnershipChange;
pub use repo::{EntityRepository, ListQuery, RepoError, RepoResult, SortDirection};
pub use service::{
    ContactService, EmployeeService, GraphSaveOutcome, ProjectService, ReplaceOutcome,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
