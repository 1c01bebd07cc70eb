//! Repository layer: the backing-store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define per-entity data access contracts used by the façade.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Update/delete of a missing row returns `RepoError::NotFound`.
//! - Read paths reject undecodable persisted state instead of masking it.
//! - Store failures are returned as-is; nothing here retries.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use rusqlite::{Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod block_repo;
pub mod document_repo;
pub mod page_repo;
pub mod user_repo;

pub use block_repo::BlockRepository;
pub use document_repo::DocumentRepository;
pub use page_repo::PageRepository;
pub use user_repo::UserRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity family named in `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Document,
    Page,
    Block,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Document => "document",
            Self::Page => "page",
            Self::Block => "block",
        }
    }
}

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, including constraint violations.
    Db(DbError),
    /// Update or delete targeted a row that does not exist.
    NotFound { entity: EntityKind, id: Uuid },
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{} not found: {id}", entity.as_str()),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
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

/// Full backing-store contract consumed by the data access façade.
pub trait Store: UserRepository + DocumentRepository + PageRepository + BlockRepository {}

impl<T> Store for T where T: UserRepository + DocumentRepository + PageRepository + BlockRepository {}

/// SQLite-backed store over one migrated connection.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = schema_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Splits a nullable-column patch into `(present, value)` SQL parameters,
/// used as `CASE WHEN present = 1 THEN value ELSE column END`.
pub(crate) fn nullable_patch(patch: &Option<Option<String>>) -> (i64, Option<&str>) {
    match patch {
        Some(value) => (1, value.as_deref()),
        None => (0, None),
    }
}

pub(crate) fn parse_uuid(row: &Row<'_>, column: &str, table: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{text}` in {table}.{column}"))
    })
}

pub(crate) fn parse_optional_uuid(
    row: &Row<'_>,
    column: &str,
    table: &str,
) -> RepoResult<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => Uuid::parse_str(&text).map(Some).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{text}` in {table}.{column}"))
        }),
        None => Ok(None),
    }
}

pub(crate) fn parse_flag(row: &Row<'_>, column: &str, table: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {table}.{column}"
        ))),
    }
}
