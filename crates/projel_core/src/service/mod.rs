//! Entity store and pure suggestion calculators.
//!
//! # Responsibility
//! - Expose the command surface callers use to mutate projects.
//! - Keep presentation layers decoupled from engine and storage details.

pub mod project_store;
pub mod suggestion;

pub use project_store::{Applied, Diagnostic, DiagnosticSink, ProjectStore, StoreError};
