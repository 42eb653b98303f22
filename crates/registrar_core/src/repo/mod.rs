//! Document-store abstraction and SQLite collections.
//!
//! # Responsibility
//! - Define the per-collection document contract (`DocumentRepository`)
//!   consumed by services and the enrollment manager.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - A single-document update is atomic; nothing spans two collections.
//! - `Update::AddRef` is a set-union and `Update::PullRef` a set-removal.
//!   Both are idempotent.
//! - Uniqueness violations surface as `RepoError::Conflict`, never as a raw
//!   SQLite error.

pub mod course_repo;
pub mod student_repo;

use crate::db::migrations::latest_version;
use crate::db::{register_text_functions, DbError};
use crate::model::course::{Course, CoursePatch};
use crate::model::student::{Student, StudentPatch};
use crate::model::ValidationError;
use rusqlite::types::Value;
use rusqlite::{ffi, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for document persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Write collides with a uniqueness constraint.
    Conflict(String),
    /// Filter has no meaning for the target collection.
    UnsupportedFilter {
        collection: &'static str,
        filter: &'static str,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::UnsupportedFilter { collection, filter } => {
                write!(f, "filter `{filter}` is not supported by `{collection}`")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Document selector for `find_where` / `update_many`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Documents whose id is in the list. An empty list matches nothing.
    IdIn(Vec<Uuid>),
    /// Documents whose reference set contains the id.
    References(Uuid),
    /// Exact match on the stored (trimmed) `name`.
    NameEquals(String),
    /// Unicode case-insensitive substring match on `name`.
    NameContains(String),
    /// Unicode case-insensitive substring match on any topic. Courses only.
    TopicContains(String),
}

impl Filter {
    fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::IdIn(_) => "id_in",
            Self::References(_) => "references",
            Self::NameEquals(_) => "name_equals",
            Self::NameContains(_) => "name_contains",
            Self::TopicContains(_) => "topic_contains",
        }
    }
}

/// Partial update applied to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<P> {
    /// Replace the fields present in the patch.
    Set(P),
    /// Add an id to the reference set if absent.
    AddRef(Uuid),
    /// Remove an id from the reference set if present.
    PullRef(Uuid),
}

/// Per-collection document-store contract.
pub trait DocumentRepository {
    type Doc;
    type Patch;

    fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Self::Doc>>;
    /// Returns matches in insertion order.
    fn find_where(&self, filter: &Filter) -> RepoResult<Vec<Self::Doc>>;
    /// Persists a new document and returns the stored state.
    fn insert(&self, doc: &Self::Doc) -> RepoResult<Self::Doc>;
    /// Returns `None` when no document has this id.
    fn update_by_id(&self, id: Uuid, update: &Update<Self::Patch>)
        -> RepoResult<Option<Self::Doc>>;
    /// Returns `true` when a document was removed.
    fn delete_by_id(&self, id: Uuid) -> RepoResult<bool>;
    /// Returns the number of documents actually modified.
    fn update_many(&self, filter: &Filter, update: &Update<Self::Patch>) -> RepoResult<u64>;
}

impl<R: DocumentRepository + ?Sized> DocumentRepository for &R {
    type Doc = R::Doc;
    type Patch = R::Patch;

    fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Self::Doc>> {
        (**self).find_by_id(id)
    }

    fn find_where(&self, filter: &Filter) -> RepoResult<Vec<Self::Doc>> {
        (**self).find_where(filter)
    }

    fn insert(&self, doc: &Self::Doc) -> RepoResult<Self::Doc> {
        (**self).insert(doc)
    }

    fn update_by_id(
        &self,
        id: Uuid,
        update: &Update<Self::Patch>,
    ) -> RepoResult<Option<Self::Doc>> {
        (**self).update_by_id(id, update)
    }

    fn delete_by_id(&self, id: Uuid) -> RepoResult<bool> {
        (**self).delete_by_id(id)
    }

    fn update_many(&self, filter: &Filter, update: &Update<Self::Patch>) -> RepoResult<u64> {
        (**self).update_many(filter, update)
    }
}

/// Student collection contract.
pub trait StudentRepository: DocumentRepository<Doc = Student, Patch = StudentPatch> {}

impl<T> StudentRepository for T where T: DocumentRepository<Doc = Student, Patch = StudentPatch> {}

/// Course collection contract.
pub trait CourseRepository: DocumentRepository<Doc = Course, Patch = CoursePatch> {}

impl<T> CourseRepository for T where T: DocumentRepository<Doc = Course, Patch = CoursePatch> {}

pub(crate) fn encode_json<T: Serialize>(value: &T, column: &'static str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode {column}: {err}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(value: &str, column: &'static str) -> RepoResult<T> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

/// Placeholder list `?, ?, ?` with matching bind values for an id list.
pub(crate) fn id_list_params(ids: &[Uuid]) -> (String, Vec<Value>) {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let values = ids.iter().map(|id| Value::Text(id.to_string())).collect();
    (placeholders, values)
}

/// Maps UNIQUE/PRIMARY KEY violations to `Conflict`; other errors pass through.
pub(crate) fn map_unique_violation(
    err: rusqlite::Error,
    message: impl FnOnce() -> String,
) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RepoError::Conflict(message())
        }
        _ => err.into(),
    }
}

pub(crate) fn ensure_connection_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    // Idempotent; covers connections migrated without `open_db`.
    register_text_functions(conn)?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::id_list_params;
    use uuid::Uuid;

    #[test]
    fn id_list_params_matches_placeholder_count() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let (placeholders, values) = id_list_params(&ids);
        assert_eq!(placeholders, "?, ?, ?");
        assert_eq!(values.len(), 3);
    }
}
