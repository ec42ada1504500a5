//! Generic id-based repository.
//!
//! # Responsibility
//! - Create, read, update, delete and list any `Entity` kind.
//! - Resolve association joins from the declaration table.
//! - Expose raw statements as an escape hatch.
//!
//! # Invariants
//! - Each call is exactly one unit of work.
//! - Missing ids are reported as `None`/`false`, never as errors.
//! - Field names in queries are validated against declared columns before
//!   they reach SQL text.
//! - Raw statements bypass every relationship rule and are never logged
//!   verbatim.

use crate::db::Store;
use crate::model::association::{Association, AssociationKind};
use crate::repo::entity::Entity;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::unit_of_work::UnitOfWork;
use log::{info, warn};
use rusqlite::types::Value;

const LIST_LIMIT_MAX: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Equality filter on one declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query options for `EntityRepository::list_all`.
///
/// Without `order` the row order is unspecified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<FieldFilter>,
    pub order: Option<OrderBy>,
    /// Clamped to 1000. `None` returns every matching row.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// Repository over every entity kind, borrowing the process-wide store.
pub struct EntityRepository<'store> {
    store: &'store Store,
}

impl<'store> EntityRepository<'store> {
    pub fn new(store: &'store Store) -> Self {
        Self { store }
    }

    /// Persists a transient entity and returns it with its id.
    pub fn create<E: Entity>(&self, entity: &E) -> RepoResult<E> {
        let created = self
            .store
            .unit_of_work("repo.create", |uow| uow.insert(entity))?;
        info!(
            "event=entity_create module=repo status=ok kind={} id={}",
            E::KIND,
            created.id().unwrap_or_default()
        );
        Ok(created)
    }

    pub fn get_by_id<E: Entity>(&self, id: i64) -> RepoResult<Option<E>> {
        self.store
            .unit_of_work("repo.get_by_id", |uow| uow.fetch::<E>(id))
    }

    /// Loads, mutates and saves one entity. The id survives the mutator.
    ///
    /// Returns `None` when `id` does not exist.
    pub fn update<E: Entity>(&self, id: i64, mutate: impl FnOnce(&mut E)) -> RepoResult<Option<E>> {
        let updated = self.store.unit_of_work("repo.update", |uow| {
            let Some(mut entity) = uow.fetch::<E>(id)? else {
                return Ok(None);
            };
            mutate(&mut entity);
            entity.set_id(id);
            uow.update(&entity)?;
            Ok(Some(entity))
        })?;

        match &updated {
            Some(_) => info!(
                "event=entity_update module=repo status=ok kind={} id={id}",
                E::KIND
            ),
            None => warn!(
                "event=entity_update module=repo status=not_found kind={} id={id}",
                E::KIND
            ),
        }
        Ok(updated)
    }

    /// Deletes one entity with its declared cascades. Returns `false` when
    /// `id` does not exist.
    pub fn delete<E: Entity>(&self, id: i64) -> RepoResult<bool> {
        let deleted = self
            .store
            .unit_of_work("repo.delete", |uow| uow.delete_cascading(E::KIND, id))?;
        if deleted {
            info!(
                "event=entity_delete module=repo status=ok kind={} id={id}",
                E::KIND
            );
        } else {
            warn!(
                "event=entity_delete module=repo status=not_found kind={} id={id}",
                E::KIND
            );
        }
        Ok(deleted)
    }

    pub fn count<E: Entity>(&self) -> RepoResult<u64> {
        self.store
            .unit_of_work("repo.count", |uow| uow.count(E::KIND))
    }

    pub fn list_all<E: Entity>(&self, query: &ListQuery) -> RepoResult<Vec<E>> {
        let mut tail = String::new();
        let mut bind_values = Vec::new();

        for (index, filter) in query.filters.iter().enumerate() {
            ensure_field::<E>(&filter.field)?;
            tail.push_str(if index == 0 { "WHERE " } else { " AND " });
            if filter.value == Value::Null {
                tail.push_str(&format!("e.{} IS NULL", filter.field));
            } else {
                tail.push_str(&format!("e.{} = ?", filter.field));
                bind_values.push(filter.value.clone());
            }
        }

        if let Some(order) = query.order.as_ref() {
            ensure_field::<E>(&order.field)?;
            tail.push_str(&format!(
                " ORDER BY e.{} {}, e.id ASC",
                order.field,
                order.direction.as_sql()
            ));
        }

        if query.limit.is_some() || query.offset > 0 {
            // SQLite needs a LIMIT before OFFSET; a negative one means unbounded.
            let limit = query
                .limit
                .map_or(-1, |limit| i64::from(limit.min(LIST_LIMIT_MAX)));
            tail.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(limit));
            if query.offset > 0 {
                tail.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        }

        self.store
            .unit_of_work("repo.list_all", |uow| uow.select::<E>(&tail, bind_values))
    }

    /// Returns every `E` with an associated row whose `field` equals `value`.
    ///
    /// `association` is looked up among the associations declared on `E`.
    /// Results are ordered by id.
    pub fn find_by_associated<E: Entity>(
        &self,
        association: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> RepoResult<Vec<E>> {
        let value = value.into();
        self.store.unit_of_work("repo.find_by_associated", |uow| {
            find_by_associated_in::<E>(uow, association, field, value)
        })
    }

    /// Runs a row-returning statement outside every relationship rule.
    ///
    /// Statements that produce no result columns are rejected with
    /// `RepoError::InvalidStatement` before they run.
    pub fn raw_query(&self, sql: &str, bind_values: &[Value]) -> RepoResult<Vec<Vec<Value>>> {
        let rows = self
            .store
            .unit_of_work("repo.raw_query", |uow| uow.query_raw(sql, bind_values))?;
        info!(
            "event=raw_query module=repo status=ok sql_len={} rows={}",
            sql.len(),
            rows.len()
        );
        Ok(rows)
    }

    /// Runs a data-changing statement outside every relationship rule.
    ///
    /// Nothing keeps contact ownership or project links consistent here; a
    /// statement that would orphan rows is still rejected by the foreign
    /// keys. Statements with result columns, `RETURNING` included, are
    /// rejected with `RepoError::InvalidStatement`.
    pub fn raw_update(&self, sql: &str, bind_values: &[Value]) -> RepoResult<usize> {
        let changed = self
            .store
            .unit_of_work("repo.raw_update", |uow| uow.execute_raw(sql, bind_values))?;
        warn!(
            "event=raw_update module=repo status=ok sql_len={} changed={changed}",
            sql.len()
        );
        Ok(changed)
    }
}

/// Association join shared with the services, inside their own unit of work.
pub(crate) fn find_by_associated_in<E: Entity>(
    uow: &UnitOfWork<'_>,
    association_name: &str,
    field: &str,
    value: Value,
) -> RepoResult<Vec<E>> {
    let association =
        E::KIND
            .association(association_name)
            .ok_or_else(|| RepoError::UnknownAssociation {
                kind: E::KIND,
                name: association_name.to_string(),
            })?;
    if !association.target.has_field(field) {
        return Err(RepoError::UnknownField {
            kind: association.target,
            field: field.to_string(),
        });
    }

    let target = association.target.table();
    let join = match association.kind {
        AssociationKind::OneToMany { fk_column } => {
            format!("INNER JOIN {target} t ON t.{fk_column} = e.id")
        }
        AssociationKind::ManyToOne { fk_column } => {
            format!("INNER JOIN {target} t ON t.id = e.{fk_column}")
        }
        AssociationKind::ManyToMany { .. } => {
            let Some((join_table, source_column, target_column)) = association.join_columns()
            else {
                return Err(RepoError::UnknownAssociation {
                    kind: E::KIND,
                    name: association_name.to_string(),
                });
            };
            format!(
                "INNER JOIN {join_table} j ON j.{source_column} = e.id \
                 INNER JOIN {target} t ON t.id = j.{target_column}"
            )
        }
    };

    uow.select::<E>(
        &format!("{join} WHERE t.{field} = ?1 ORDER BY e.id ASC"),
        vec![value],
    )
}

/// Targets of `association` reached from the source row `source_id`,
/// ordered by id.
pub(crate) fn load_association_in<E: Entity>(
    uow: &UnitOfWork<'_>,
    association: &Association,
    source_id: i64,
) -> RepoResult<Vec<E>> {
    let unknown = || RepoError::UnknownAssociation {
        kind: association.source,
        name: association.name.to_string(),
    };
    if association.target != E::KIND {
        return Err(unknown());
    }
    let filter = match association.kind {
        AssociationKind::OneToMany { fk_column } => format!("WHERE e.{fk_column} = ?1"),
        AssociationKind::ManyToOne { fk_column } => format!(
            "INNER JOIN {} s ON s.{fk_column} = e.id WHERE s.id = ?1",
            association.source.table()
        ),
        AssociationKind::ManyToMany { .. } => {
            let (join_table, source_column, target_column) =
                association.join_columns().ok_or_else(unknown)?;
            format!(
                "INNER JOIN {join_table} j ON j.{target_column} = e.id \
                 WHERE j.{source_column} = ?1"
            )
        }
    };
    uow.select::<E>(
        &format!("{filter} ORDER BY e.id ASC"),
        vec![Value::Integer(source_id)],
    )
}

fn ensure_field<E: Entity>(field: &str) -> RepoResult<()> {
    if E::KIND.has_field(field) {
        Ok(())
    } else {
        Err(RepoError::UnknownField {
            kind: E::KIND,
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ListQuery, SortDirection};

    #[test]
    fn builder_collects_filters_and_order() {
        let query = ListQuery::all()
            .filter("contact_type", "EMAIL".to_string())
            .order_by("value", SortDirection::Descending)
            .limit(5)
            .offset(2);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].field, "contact_type");
        assert_eq!(
            query.order.as_ref().map(|order| order.direction),
            Some(SortDirection::Descending)
        );
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, 2);
    }
}
