//! Entity graph of one electrical-installation project.
//!
//! # Responsibility
//! - Define the five entity kinds owned by a `Project` aggregate.
//! - Provide local, single-entity validation (`validate()` on each type).
//!
//! # Invariants
//! - Every entity is identified by a stable `Uuid`.
//! - Cross-entity rules (references, uniqueness, cascades) live in
//!   `crate::engine`, never here.
//! - Serialized field names follow the persisted document layout
//!   (`zonas`, `locais`, `cargas`, `propostas`, `circuitos`).

pub mod circuit;
pub mod load;
pub mod location;
pub mod project;
pub mod proposal;
pub mod zone;
mod validation;

use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub use validation::ValidationError;

/// Entity kinds addressed by errors, warnings and audit reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Zone,
    Location,
    Load,
    Proposal,
    Circuit,
    /// Client-local draft grouping ("pre-circuit").
    Draft,
}

impl EntityKind {
    /// Stable lowercase name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Zone => "zone",
            Self::Location => "location",
            Self::Load => "load",
            Self::Proposal => "proposal",
            Self::Circuit => "circuit",
            Self::Draft => "draft",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
