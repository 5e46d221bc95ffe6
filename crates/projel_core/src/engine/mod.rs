//! Pure consistency transformations over one `Project` aggregate.
//!
//! # Responsibility
//! - Guard cross-entity references and identifier uniqueness.
//! - Propagate deletions and garbage-collect emptied circuits.
//! - Keep load/circuit membership and back-references in sync.
//! - Drive the proposal lifecycle and its formalization into circuits.
//!
//! # Invariants
//! - Every operation takes `&Project` and returns a new aggregate; on error
//!   the input is untouched and nothing is returned to commit.
//! - No committed aggregate contains a circuit with an empty load set.
//! - Advisory findings travel as `Warning`s and never abort an operation.
//!
//! # See also
//! - `crate::service::project_store` for the command surface that commits
//!   these transitions.

pub mod assignment;
pub mod cascade;
pub mod commands;
pub mod drafts;
pub mod integrity;
pub mod lifecycle;

use crate::model::circuit::{CircuitId, CircuitKind};
use crate::model::load::LoadKind;
use crate::model::project::Project;
use crate::model::proposal::{ProposalId, ProposalStatus};
use crate::model::{EntityKind, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

/// Hard cross-entity constraint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Another circuit already uses this normalized identifier.
    DuplicateCircuitIdentifier { identifier: String },
    /// Zone still referenced by locations, circuits or inherited load zones.
    ZoneInUse {
        zone_id: Uuid,
        locations: usize,
        circuits: usize,
        loads: usize,
    },
    /// Proposal still referenced by formalized circuits.
    ProposalInUse { proposal_id: Uuid, circuits: usize },
    /// A referenced entity does not exist in the project.
    DanglingReference { kind: EntityKind, id: Uuid },
}

impl Display for IntegrityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateCircuitIdentifier { identifier } => {
                write!(f, "circuit identifier already in use: {identifier}")
            }
            Self::ZoneInUse {
                zone_id,
                locations,
                circuits,
                loads,
            } => write!(
                f,
                "zone {zone_id} is still referenced by {locations} location(s), \
                 {circuits} circuit(s) and {loads} load(s)"
            ),
            Self::ProposalInUse {
                proposal_id,
                circuits,
            } => write!(
                f,
                "proposal {proposal_id} is still referenced by {circuits} circuit(s)"
            ),
            Self::DanglingReference { kind, id } => {
                write!(f, "referenced {kind} does not exist: {id}")
            }
        }
    }
}

impl Error for IntegrityError {}

/// Blocking outcome of an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Validation(ValidationError),
    Integrity(IntegrityError),
    NotFound { kind: EntityKind, id: Uuid },
    InvalidTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Integrity(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid proposal transition: {from} -> {to}")
            }
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Integrity(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidTransition { .. } => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<IntegrityError> for EngineError {
    fn from(value: IntegrityError) -> Self {
        Self::Integrity(value)
    }
}

impl EngineError {
    pub(crate) fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

/// Advisory finding attached to a committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Load kind does not match the receiving circuit's kind.
    CircuitTypeMismatch {
        circuit_id: CircuitId,
        circuit_kind: CircuitKind,
        load_id: Uuid,
        load_kind: LoadKind,
    },
    /// Circuit removed because its load set became empty.
    CircuitCollected {
        circuit_id: CircuitId,
        identifier: String,
    },
    /// Normative observation raised while analyzing a proposal.
    NormativeAlert {
        proposal_id: ProposalId,
        message: String,
    },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CircuitTypeMismatch {
                circuit_kind,
                load_kind,
                ..
            } => write!(
                f,
                "{} load assigned to a {} circuit",
                load_kind.as_str(),
                circuit_kind.code()
            ),
            Self::CircuitCollected { identifier, .. } => {
                write!(f, "circuit {identifier} removed: no loads left")
            }
            Self::NormativeAlert { message, .. } => f.write_str(message),
        }
    }
}

/// Result of a successful engine operation: the next aggregate, an
/// operation-specific value and the advisory findings it produced.
#[derive(Debug, Clone)]
pub struct Transition<T> {
    pub project: Project,
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Transition<T> {
    pub(crate) fn new(project: Project, value: T, warnings: Vec<Warning>) -> Self {
        Self {
            project,
            value,
            warnings,
        }
    }

    pub(crate) fn quiet(project: Project, value: T) -> Self {
        Self::new(project, value, Vec::new())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transition<U> {
        Transition {
            project: self.project,
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
