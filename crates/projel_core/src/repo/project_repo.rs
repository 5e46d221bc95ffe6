//! Project document repository contracts and implementations.
//!
//! # Responsibility
//! - Load and save every project of one store as a single JSON document.
//! - Version the document so newer layouts are refused, not misread.
//!
//! # Invariants
//! - One document per storage key.
//! - Draft groupings are never written (`Project::drafts` is skipped).
//! - A document without `version` is read as version 0.

use crate::db::DbError;
use crate::model::project::Project;
use crate::model::now_epoch_ms;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Layout version written by this build.
pub const DOCUMENT_VERSION: u32 = 1;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Serialization(serde_json::Error),
    UnsupportedDocumentVersion { found: u32, supported: u32 },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "project document serialization failed: {err}"),
            Self::UnsupportedDocumentVersion { found, supported } => write!(
                f,
                "project document version {found} is newer than supported {supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::UnsupportedDocumentVersion { .. } => None,
            Self::InvalidData(_) => None,
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

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Persistence boundary of the entity store.
pub trait ProjectRepository {
    /// Returns every persisted project, or an empty list when nothing was
    /// saved under this repository's key yet.
    fn load(&self) -> RepoResult<Vec<Project>>;
    /// Replaces the persisted document with `projects`.
    fn save(&self, projects: &[Project]) -> RepoResult<()>;
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    version: u32,
    projects: &'a [Project],
}

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    projects: Vec<Project>,
}

/// Serializes projects into the versioned document layout.
pub fn encode_document(projects: &[Project]) -> RepoResult<String> {
    Ok(serde_json::to_string(&DocumentOut {
        version: DOCUMENT_VERSION,
        projects,
    })?)
}

/// Parses a document, refusing layouts newer than `DOCUMENT_VERSION`.
pub fn decode_document(body: &str) -> RepoResult<Vec<Project>> {
    let document: DocumentIn = serde_json::from_str(body)?;
    if document.version > DOCUMENT_VERSION {
        return Err(RepoError::UnsupportedDocumentVersion {
            found: document.version,
            supported: DOCUMENT_VERSION,
        });
    }
    if let Some(project) = document.projects.iter().find(|p| p.validate().is_err()) {
        return Err(RepoError::InvalidData(format!(
            "project {} failed validation",
            project.id
        )));
    }
    Ok(document.projects)
}

/// SQLite-backed repository storing the document in the `documents` table.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
    storage_key: String,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Wraps a migrated connection. Fails when the `documents` table is
    /// missing (connection not opened through `db::open_db*`).
    pub fn try_new(conn: &'conn Connection, storage_key: impl Into<String>) -> RepoResult<Self> {
        let ready: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents');",
            [],
            |row| row.get(0),
        )?;
        if !ready {
            return Err(RepoError::InvalidData(
                "documents table is missing; open the connection with db::open_db".to_string(),
            ));
        }
        Ok(Self {
            conn,
            storage_key: storage_key.into(),
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn load(&self) -> RepoResult<Vec<Project>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE storage_key = ?1;",
                params![self.storage_key],
                |row| row.get(0),
            )
            .optional()?;

        let projects = match body {
            Some(body) => decode_document(&body)?,
            None => Vec::new(),
        };
        debug!(
            "event=document_load module=repo status=ok projects={}",
            projects.len()
        );
        Ok(projects)
    }

    fn save(&self, projects: &[Project]) -> RepoResult<()> {
        let body = encode_document(projects)?;
        let result = self.conn.execute(
            "INSERT INTO documents (storage_key, body, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(storage_key) DO UPDATE SET
                 body = excluded.body,
                 updated_at = excluded.updated_at;",
            params![self.storage_key, body, now_epoch_ms()],
        );
        if let Err(err) = &result {
            error!("event=document_save module=repo status=error error={err}");
        }
        result?;
        debug!(
            "event=document_save module=repo status=ok projects={} bytes={}",
            projects.len(),
            body.len()
        );
        Ok(())
    }
}

/// In-memory repository keeping the serialized document text.
///
/// Goes through the same encode/decode path as the SQLite repository.
#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    body: RefCell<Option<String>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing document body.
    pub fn with_document(body: impl Into<String>) -> Self {
        Self {
            body: RefCell::new(Some(body.into())),
        }
    }

    /// Last saved document body, if any.
    pub fn document(&self) -> Option<String> {
        self.body.borrow().clone()
    }
}

impl ProjectRepository for InMemoryProjectRepository {
    fn load(&self) -> RepoResult<Vec<Project>> {
        match self.body.borrow().as_deref() {
            Some(body) => decode_document(body),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, projects: &[Project]) -> RepoResult<()> {
        let body = encode_document(projects)?;
        *self.body.borrow_mut() = Some(body);
        Ok(())
    }
}

impl<R: ProjectRepository + ?Sized> ProjectRepository for &R {
    fn load(&self) -> RepoResult<Vec<Project>> {
        (**self).load()
    }

    fn save(&self, projects: &[Project]) -> RepoResult<()> {
        (**self).save(projects)
    }
}
