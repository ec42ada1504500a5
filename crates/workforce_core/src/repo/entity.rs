//! Row mapping for the three persisted entity kinds.
//!
//! # Invariants
//! - `column_values` yields values in `EntityKind::columns()` order.
//! - `from_row` reads columns by name, so any select list aliased to the
//!   column names can be mapped.

use crate::model::association::EntityKind;
use crate::model::contact::Contact;
use crate::model::employee::Employee;
use crate::model::project::Project;
use crate::repo::error::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;

/// Entity stored in one table with an integer primary key.
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    fn column_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

impl Entity for Employee {
    const KIND: EntityKind = EntityKind::Employee;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.first_name.clone()),
            Value::Text(self.last_name.clone()),
            Value::Integer(i64::from(self.salary)),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            salary: row.get("salary")?,
        })
    }
}

impl Entity for Contact {
    const KIND: EntityKind = EntityKind::Contact;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.contact_type.clone()),
            Value::Text(self.value.clone()),
            optional_text(self.description.as_deref()),
            self.employee_id.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            contact_type: row.get("contact_type")?,
            value: row.get("value")?,
            description: row.get("description")?,
            employee_id: row.get("employee_id")?,
        })
    }
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            optional_text(self.description.as_deref()),
            optional_text(self.status.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            description: row.get("description")?,
            status: row.get("status")?,
        })
    }
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

/// `alias.id AS id, alias.col AS col, ...` for `kind`.
pub(crate) fn select_list(kind: EntityKind, alias: &str) -> String {
    std::iter::once("id")
        .chain(kind.columns().iter().copied())
        .map(|column| format!("{alias}.{column} AS {column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn insert_sql(kind: EntityKind) -> String {
    let columns = kind.columns();
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        kind.table(),
        columns.join(", ")
    )
}

/// Update by id; the id binds to the last placeholder.
pub(crate) fn update_sql(kind: EntityKind) -> String {
    let columns = kind.columns();
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {assignments} WHERE id = ?{};",
        kind.table(),
        columns.len() + 1
    )
}

#[cfg(test)]
mod tests {
    use super::{insert_sql, select_list, update_sql, Entity};
    use crate::model::association::EntityKind;
    use crate::model::contact::Contact;
    use rusqlite::types::Value;

    #[test]
    fn generated_sql_follows_declared_columns() {
        assert_eq!(
            insert_sql(EntityKind::Project),
            "INSERT INTO projects (name, description, status) VALUES (?1, ?2, ?3);"
        );
        assert_eq!(
            update_sql(EntityKind::Employee),
            "UPDATE employees SET first_name = ?1, last_name = ?2, salary = ?3 WHERE id = ?4;"
        );
        assert_eq!(
            select_list(EntityKind::Employee, "e"),
            "e.id AS id, e.first_name AS first_name, e.last_name AS last_name, e.salary AS salary"
        );
    }

    #[test]
    fn unowned_contact_binds_null_owner() {
        let contact = Contact::new("EMAIL", "joan@x.cat", None);
        let values = contact.column_values();
        assert_eq!(values.len(), EntityKind::Contact.columns().len());
        assert_eq!(values[2], Value::Null);
        assert_eq!(values[3], Value::Null);
    }
}
