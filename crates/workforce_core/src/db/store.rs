//! Process-wide store handle.
//!
//! # Responsibility
//! - Own the single SQLite connection for the lifetime of the process.
//! - Hand out exclusive access to one unit of work at a time.
//!
//! # Invariants
//! - Built once via `Store::open`, released once via `Store::close` or drop.
//! - Callers never hold the connection across operations; every public
//!   operation borrows it for exactly one transaction scope.

use super::{open_db_in_memory, open_db_with_timeout, DbResult};
use crate::config::{ReferencePolicy, StoreConfig, StoreLocation};
use log::{info, warn};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Explicitly constructed context passed by reference to repositories and
/// services.
pub struct Store {
    conn: Mutex<Connection>,
    location: StoreLocation,
    reference_policy: ReferencePolicy,
}

impl Store {
    /// Opens the store described by `config` and applies migrations.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let conn = match &config.location {
            StoreLocation::File(path) => open_db_with_timeout(path, config.busy_timeout)?,
            StoreLocation::Memory => {
                let conn = open_db_in_memory()?;
                conn.busy_timeout(config.busy_timeout)?;
                conn
            }
        };

        info!(
            "event=store_open module=store status=ok mode={} reference_policy={}",
            location_mode(&config.location),
            config.reference_policy.as_str()
        );

        Ok(Self {
            conn: Mutex::new(conn),
            location: config.location.clone(),
            reference_policy: config.reference_policy,
        })
    }

    /// Opens a private in-memory store with default settings.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn reference_policy(&self) -> ReferencePolicy {
        self.reference_policy
    }

    /// Releases the connection, reporting close failures.
    pub fn close(self) -> DbResult<()> {
        let mode = location_mode(&self.location);
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        match conn.close() {
            Ok(()) => {
                info!("event=store_close module=store status=ok mode={mode}");
                Ok(())
            }
            Err((_, err)) => {
                warn!("event=store_close module=store status=error mode={mode} error={err}");
                Err(err.into())
            }
        }
    }

    /// Locks the connection for one transaction scope.
    ///
    /// A poisoned lock is recovered: the panicking scope's transaction was
    /// rolled back when it unwound.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=store_lock module=store status=recovered reason=poisoned");
            poisoned.into_inner()
        })
    }
}

fn location_mode(location: &StoreLocation) -> &'static str {
    match location {
        StoreLocation::File(_) => "file",
        StoreLocation::Memory => "memory",
    }
}
