//! Per-operation transaction scope.
//!
//! # Responsibility
//! - Run every public operation inside exactly one SQLite transaction.
//! - Offer the store primitives that relationship rules are flushed through.
//! - Drive cascading delete from the association declaration table.
//!
//! # Invariants
//! - `Idle -> Open -> (Committed | RolledBack) -> Closed` on every exit path,
//!   panics included.
//! - A failed operation leaves no partial writes behind.
//! - Many-to-many edges are decoupled on delete; the entity on the other side
//!   survives.

use crate::config::ReferencePolicy;
use crate::db::Store;
use crate::model::association::{
    Association, AssociationKind, EntityKind, Side, EMPLOYEE_CONTACTS, EMPLOYEE_PROJECT_JOIN,
};
use crate::model::contact::ContactId;
use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use crate::relation::contact_links::{ContactOwnership, OrphanRemoval, OwnershipChange};
use crate::relation::project_links::{LinkDiff, ProjectEdge, ProjectLinks};
use crate::repo::entity::{insert_sql, select_list, update_sql, Entity};
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, error, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Transaction, TransactionBehavior};
use std::time::Instant;

/// Lifecycle of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Open,
    Committed,
    RolledBack,
    Closed,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
            Self::Closed => "closed",
        }
    }
}

/// Tracks state transitions and closes the scope when dropped.
struct Scope {
    operation: &'static str,
    started_at: Instant,
    state: TransactionState,
}

impl Scope {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            started_at: Instant::now(),
            state: TransactionState::Idle,
        }
    }

    fn advance(&mut self, next: TransactionState) {
        debug!(
            "event=uow_transition module=uow operation={} from={} to={}",
            self.operation,
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            // Unwinding: the transaction was dropped, which rolls it back.
            error!(
                "event=uow_rollback module=uow status=error operation={} reason=unwound",
                self.operation
            );
            self.advance(TransactionState::RolledBack);
        }
        let outcome = self.state;
        self.advance(TransactionState::Closed);
        debug!(
            "event=uow_close module=uow operation={} outcome={} duration_ms={}",
            self.operation,
            outcome.as_str(),
            self.started_at.elapsed().as_millis()
        );
    }
}

impl Store {
    /// Runs `work` inside one immediate transaction.
    ///
    /// `Ok` commits, `Err` rolls back and is returned unchanged. A panic
    /// inside `work` rolls back while unwinding.
    pub(crate) fn unit_of_work<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce(&mut UnitOfWork<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut scope = Scope::new(operation);
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| {
                error!("event=uow_begin module=uow status=error operation={operation} error={err}");
                RepoError::from(err)
            })?;
        scope.advance(TransactionState::Open);

        let mut uow = UnitOfWork {
            tx,
            operation,
            reference_policy: self.reference_policy(),
        };

        match work(&mut uow) {
            Ok(value) => match uow.tx.commit() {
                Ok(()) => {
                    scope.advance(TransactionState::Committed);
                    Ok(value)
                }
                Err(err) => {
                    scope.advance(TransactionState::RolledBack);
                    error!(
                        "event=uow_commit module=uow status=error operation={operation} error={err}"
                    );
                    Err(err.into())
                }
            },
            Err(err) => {
                if let Err(rollback_err) = uow.tx.rollback() {
                    error!(
                        "event=uow_rollback module=uow status=error operation={operation} error={rollback_err}"
                    );
                }
                scope.advance(TransactionState::RolledBack);
                error!(
                    "event=uow_rollback module=uow status=ok operation={operation} cause={err}"
                );
                Err(err)
            }
        }
    }
}

/// Handle passed to the body of one unit of work.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
    operation: &'static str,
    reference_policy: ReferencePolicy,
}

impl UnitOfWork<'_> {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn reference_policy(&self) -> ReferencePolicy {
        self.reference_policy
    }

    /// Inserts a transient entity and returns it with its assigned id.
    pub fn insert<E: Entity>(&self, entity: &E) -> RepoResult<E> {
        if let Some(id) = entity.id() {
            return Err(RepoError::AlreadyPersisted { kind: E::KIND, id });
        }
        self.tx.execute(
            &insert_sql(E::KIND),
            params_from_iter(entity.column_values()),
        )?;
        let mut persisted = entity.clone();
        persisted.set_id(self.tx.last_insert_rowid());
        Ok(persisted)
    }

    pub fn fetch<E: Entity>(&self, id: i64) -> RepoResult<Option<E>> {
        let rows = self.select::<E>("WHERE e.id = ?1", vec![Value::Integer(id)])?;
        Ok(rows.into_iter().next())
    }

    /// Saves every column of a persisted entity. Returns `false` when the
    /// row no longer exists.
    pub fn update<E: Entity>(&self, entity: &E) -> RepoResult<bool> {
        let id = entity.id().ok_or_else(|| {
            RepoError::InvalidData(format!("cannot update a transient {}", E::KIND))
        })?;
        let mut values = entity.column_values();
        values.push(Value::Integer(id));
        let changed = self
            .tx
            .execute(&update_sql(E::KIND), params_from_iter(values))?;
        Ok(changed > 0)
    }

    pub fn exists(&self, kind: EntityKind, id: i64) -> RepoResult<bool> {
        let exists: i64 = self.tx.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                kind.table()
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    pub fn count(&self, kind: EntityKind) -> RepoResult<u64> {
        let count: i64 = self.tx.query_row(
            &format!("SELECT COUNT(*) FROM {};", kind.table()),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    /// Selects distinct rows of `E` aliased as `e`; `tail` holds joins,
    /// filters and ordering.
    pub(crate) fn select<E: Entity>(&self, tail: &str, bind_values: Vec<Value>) -> RepoResult<Vec<E>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM {} e {tail};",
            select_list(E::KIND, "e"),
            E::KIND.table()
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    /// Deletes one row and applies every declared association policy first.
    ///
    /// Returns `false` when the row does not exist.
    pub fn delete_cascading(&self, kind: EntityKind, id: i64) -> RepoResult<bool> {
        if !self.exists(kind, id)? {
            return Ok(false);
        }

        for association in kind.associations() {
            self.release_association(association, id)?;
        }

        self.tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", kind.table()),
            [id],
        )?;
        debug!(
            "event=uow_delete module=uow operation={} kind={kind} id={id}",
            self.operation
        );
        Ok(true)
    }

    fn release_association(&self, association: &Association, source_id: i64) -> RepoResult<()> {
        match association.kind {
            AssociationKind::OneToMany { fk_column } => {
                let mut ownership = self.ownership_by(association, fk_column, source_id)?;
                let orphans = ownership.detach_employee(source_id);
                if orphans.is_empty() {
                    return Ok(());
                }
                if !association.cascade.remove {
                    return Err(RepoError::ConstraintViolation(format!(
                        "{} {source_id} still owns {} {} row(s)",
                        association.source,
                        orphans.len(),
                        association.target
                    )));
                }
                for orphan in orphans {
                    self.delete_cascading(association.target, orphan.contact_id)?;
                }
            }
            AssociationKind::ManyToMany { .. } => {
                let mut links = self.project_links_touching(association.source, source_id)?;
                let removed = match association.side {
                    Side::Owning => links.detach_employee(source_id),
                    Side::Inverse => links.detach_project(source_id),
                };
                self.flush_link_diff(&LinkDiff {
                    removed,
                    ..LinkDiff::default()
                })?;
            }
            AssociationKind::ManyToOne { .. } => {}
        }
        Ok(())
    }

    fn ownership_by(
        &self,
        association: &Association,
        fk_column: &str,
        owner_id: i64,
    ) -> RepoResult<ContactOwnership> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT id, {fk_column} FROM {} WHERE {fk_column} = ?1;",
            association.target.table()
        ))?;
        let pairs = stmt
            .query_map([owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(ContactId, EmployeeId)>, _>>()?;
        Ok(ContactOwnership::from_pairs(pairs))
    }

    /// Loads the ownership records of every contact of `employee_id`.
    pub fn contact_ownership_of(&self, employee_id: EmployeeId) -> RepoResult<ContactOwnership> {
        let association = contacts_association()?;
        match association.kind {
            AssociationKind::OneToMany { fk_column } => {
                self.ownership_by(association, fk_column, employee_id)
            }
            _ => Err(RepoError::UnknownAssociation {
                kind: EntityKind::Employee,
                name: EMPLOYEE_CONTACTS.to_string(),
            }),
        }
    }

    /// Persists the owner change reported by `ContactOwnership::link`.
    pub fn flush_ownership_change(&self, change: OwnershipChange) -> RepoResult<()> {
        let (contact_id, employee_id) = match change {
            OwnershipChange::Attached {
                contact_id,
                employee_id,
            } => (contact_id, employee_id),
            OwnershipChange::Moved { contact_id, to, .. } => (contact_id, to),
            OwnershipChange::Unchanged => return Ok(()),
        };
        self.tx.execute(
            "UPDATE contacts SET employee_id = ?1 WHERE id = ?2;",
            params![employee_id, contact_id],
        )?;
        Ok(())
    }

    /// Deletes contacts detached from their owner.
    pub fn flush_orphan_removals(&self, orphans: &[OrphanRemoval]) -> RepoResult<usize> {
        let mut deleted = 0;
        for orphan in orphans {
            if self.delete_cascading(EntityKind::Contact, orphan.contact_id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    pub fn project_links_of_employee(&self, employee_id: EmployeeId) -> RepoResult<ProjectLinks> {
        self.project_links_touching(EntityKind::Employee, employee_id)
    }

    pub fn project_links_of_project(&self, project_id: ProjectId) -> RepoResult<ProjectLinks> {
        self.project_links_touching(EntityKind::Project, project_id)
    }

    fn project_links_touching(&self, kind: EntityKind, id: i64) -> RepoResult<ProjectLinks> {
        let join = &EMPLOYEE_PROJECT_JOIN;
        let column = match kind {
            EntityKind::Employee => join.owner_column,
            EntityKind::Project => join.inverse_column,
            EntityKind::Contact => return Ok(ProjectLinks::new()),
        };
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {owner}, {inverse} FROM {table} WHERE {column} = ?1;",
            owner = join.owner_column,
            inverse = join.inverse_column,
            table = join.table,
        ))?;
        let edges = stmt
            .query_map([id], |row| Ok(ProjectEdge::new(row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProjectLinks::from_edges(edges))
    }

    /// Writes added and removed edges; retained edges are not touched.
    pub fn flush_link_diff(&self, diff: &LinkDiff) -> RepoResult<()> {
        let join = &EMPLOYEE_PROJECT_JOIN;
        for edge in &diff.removed {
            self.tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1 AND {} = ?2;",
                    join.table, join.owner_column, join.inverse_column
                ),
                params![edge.employee_id, edge.project_id],
            )?;
        }
        for edge in &diff.added {
            self.tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2);",
                    join.table, join.owner_column, join.inverse_column
                ),
                params![edge.employee_id, edge.project_id],
            )?;
        }
        Ok(())
    }

    /// Checks that `id` names an existing row of `kind`.
    ///
    /// Unknown ids yield `Ok(false)` under `ReferencePolicy::Skip` and
    /// `RepoError::InvalidReference` under `ReferencePolicy::Reject`.
    pub fn resolve_reference(&self, kind: EntityKind, id: i64) -> RepoResult<bool> {
        if self.exists(kind, id)? {
            return Ok(true);
        }
        match self.reference_policy {
            ReferencePolicy::Skip => {
                warn!(
                    "event=reference_skipped module=uow operation={} kind={kind} id={id}",
                    self.operation
                );
                Ok(false)
            }
            ReferencePolicy::Reject => Err(RepoError::InvalidReference { kind, id }),
        }
    }

    /// Runs one row-returning statement and collects every column as a
    /// dynamically typed value.
    pub(crate) fn query_raw(&self, sql: &str, bind_values: &[Value]) -> RepoResult<Vec<Vec<Value>>> {
        let mut stmt = self.tx.prepare(sql)?;
        let column_count = stmt.column_count();
        if column_count == 0 {
            return Err(RepoError::InvalidStatement(
                "raw_query only accepts statements that return rows".to_string(),
            ));
        }
        let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(row.get::<_, Value>(index)?);
            }
            out.push(values);
        }
        Ok(out)
    }

    pub(crate) fn execute_raw(&self, sql: &str, bind_values: &[Value]) -> RepoResult<usize> {
        let mut stmt = self.tx.prepare(sql)?;
        if stmt.column_count() > 0 {
            return Err(RepoError::InvalidStatement(
                "raw_update does not accept statements that return rows".to_string(),
            ));
        }
        Ok(stmt.execute(params_from_iter(bind_values.iter()))?)
    }
}

fn contacts_association() -> RepoResult<&'static Association> {
    EntityKind::Employee
        .association(EMPLOYEE_CONTACTS)
        .ok_or_else(|| RepoError::UnknownAssociation {
            kind: EntityKind::Employee,
            name: EMPLOYEE_CONTACTS.to_string(),
        })
}
