//! Core consistency engine for electrical-installation projects.
//! This crate is the single source of truth for entity-graph invariants.

pub mod advisory;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use advisory::analysis::{
    analyze_grouping, AnalysisError, AnalysisReport, AnalysisRequest, ProposalAnalyzer,
    RuleBasedAnalyzer,
};
pub use advisory::catalog::{CatalogEntry, CatalogError, InstallationCatalog, StaticCatalog};
pub use config::{ConfigError, StoreConfig};
pub use engine::drafts::DraftTarget;
pub use engine::integrity::IntegrityViolation;
pub use engine::lifecycle::ProposalEdit;
pub use engine::{EngineError, IntegrityError, Warning};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::circuit::{Circuit, CircuitDraft, CircuitId, CircuitKind};
pub use model::load::{Load, LoadId, LoadKind, PowerUnit};
pub use model::location::{Location, LocationId, LocationProfile};
pub use model::project::{ElectricalSystem, Project, ProjectId, ProjectPatch};
pub use model::proposal::{DraftId, Proposal, ProposalId, ProposalStatus};
pub use model::zone::{Zone, ZoneId};
pub use model::{EntityKind, ValidationError};
pub use repo::{
    InMemoryProjectRepository, ProjectRepository, RepoError, RepoResult,
    SqliteProjectRepository,
};
pub use service::{Applied, Diagnostic, DiagnosticSink, ProjectStore, StoreError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
