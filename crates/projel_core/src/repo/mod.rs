//! Persistence boundary for the project aggregate.
//!
//! # Responsibility
//! - Define the `ProjectRepository` contract used by the entity store.
//! - Keep SQLite and document-layout details out of the engine.
//!
//! # Invariants
//! - Repositories persist whole documents; there are no partial writes.
//! - Loading never repairs data silently; unreadable documents are errors.

pub mod project_repo;

pub use project_repo::{
    decode_document, encode_document, InMemoryProjectRepository, ProjectRepository, RepoError,
    RepoResult, SqliteProjectRepository, DOCUMENT_VERSION,
};
