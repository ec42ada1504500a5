use crate::db::DbError;
use crate::model::association::EntityKind;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Typed failure of one unit of work.
///
/// Any variant returned from inside a unit of work means it was rolled back.
#[derive(Debug)]
pub enum RepoError {
    /// The store rejected a write (NOT NULL, CHECK, foreign or primary key).
    ConstraintViolation(String),
    /// Engine or connectivity failure.
    Storage(DbError),
    /// A relationship mutation named an id that does not resolve, under
    /// `ReferencePolicy::Reject`.
    InvalidReference { kind: EntityKind, id: i64 },
    InvalidData(String),
    UnknownField { kind: EntityKind, field: String },
    UnknownAssociation { kind: EntityKind, name: String },
    /// `create` was handed an entity that already carries an id.
    AlreadyPersisted { kind: EntityKind, id: i64 },
    /// A raw statement was sent through the wrong escape hatch.
    InvalidStatement(String),
}

impl RepoError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
            Self::InvalidReference { kind, id } => write!(f, "{kind} {id} does not exist"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UnknownField { kind, field } => write!(f, "{kind} has no field `{field}`"),
            Self::UnknownAssociation { kind, name } => {
                write!(f, "{kind} has no association `{name}`")
            }
            Self::AlreadyPersisted { kind, id } => {
                write!(f, "{kind} is already persisted with id {id}")
            }
            Self::InvalidStatement(message) => write!(f, "invalid raw statement: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(
                    message
                        .clone()
                        .unwrap_or_else(|| failure.to_string()),
                )
            }
            _ => Self::Storage(DbError::Sqlite(value)),
        }
    }
}
