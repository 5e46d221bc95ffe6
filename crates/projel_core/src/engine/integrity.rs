//! Referential integrity guard.
//!
//! # Responsibility
//! - Check references and identifier uniqueness before a mutation commits.
//! - Audit a whole aggregate for broken graph invariants.
//!
//! # Invariants
//! - Guards are read-only; they never mutate the project.
//! - Identifier comparison uses `normalize_identifier` on both sides.

use super::{EngineError, EngineResult, IntegrityError};
use crate::model::circuit::{normalize_identifier, CircuitId};
use crate::model::load::LoadId;
use crate::model::location::LocationId;
use crate::model::project::Project;
use crate::model::zone::ZoneId;
use crate::model::{EntityKind, ValidationError};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub fn ensure_zone_exists(project: &Project, zone_id: ZoneId) -> EngineResult<()> {
    if project.zone(zone_id).is_some() {
        return Ok(());
    }
    Err(dangling(EntityKind::Zone, zone_id))
}

pub fn ensure_location_exists(project: &Project, location_id: LocationId) -> EngineResult<()> {
    if project.location(location_id).is_some() {
        return Ok(());
    }
    Err(dangling(EntityKind::Location, location_id))
}

/// Requires a non-empty set of loads that all exist in the project.
pub fn ensure_loads_exist(
    project: &Project,
    kind: EntityKind,
    load_ids: &[LoadId],
) -> EngineResult<()> {
    if load_ids.is_empty() {
        return Err(ValidationError::EmptyLoadSet(kind).into());
    }
    match load_ids.iter().find(|id| project.load(**id).is_none()) {
        Some(missing) => Err(dangling(EntityKind::Load, *missing)),
        None => Ok(()),
    }
}

/// Normalizes `raw` and checks it against every other circuit.
///
/// `except` names the circuit being updated, whose own identifier does not
/// count as a collision. Returns the normalized identifier.
pub fn ensure_identifier_available(
    project: &Project,
    raw: &str,
    except: Option<CircuitId>,
) -> EngineResult<String> {
    let identifier = normalize_identifier(raw);
    if identifier.is_empty() {
        return Err(ValidationError::BlankIdentifier.into());
    }
    let taken = project.circuits.iter().any(|circuit| {
        Some(circuit.id) != except && normalize_identifier(&circuit.identifier) == identifier
    });
    if taken {
        return Err(IntegrityError::DuplicateCircuitIdentifier { identifier }.into());
    }
    Ok(identifier)
}

/// Entities that still point at a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneDependents {
    pub locations: usize,
    pub circuits: usize,
    /// Loads whose inherited zone is this zone.
    pub loads: usize,
}

impl ZoneDependents {
    pub fn is_empty(&self) -> bool {
        self.locations == 0 && self.circuits == 0 && self.loads == 0
    }
}

/// Counts the locations, circuits and loads that still reference `zone_id`.
pub fn zone_dependents(project: &Project, zone_id: ZoneId) -> ZoneDependents {
    let locations = project
        .locations
        .iter()
        .filter(|location| location.zone_id == zone_id)
        .count();
    let circuits = project
        .circuits
        .iter()
        .filter(|circuit| circuit.zone_id == zone_id)
        .count();
    let loads = project
        .loads
        .iter()
        .filter(|load| load.zone_id == Some(zone_id))
        .count();
    ZoneDependents {
        locations,
        circuits,
        loads,
    }
}

fn dangling(kind: EntityKind, id: Uuid) -> EngineError {
    IntegrityError::DanglingReference { kind, id }.into()
}

/// One broken invariant found by `audit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    EmptyCircuit {
        circuit_id: CircuitId,
    },
    DuplicateIdentifier {
        identifier: String,
        count: usize,
    },
    DanglingReference {
        from: EntityKind,
        from_id: Uuid,
        to: EntityKind,
        to_id: Uuid,
    },
    /// A load's back-reference disagrees with circuit membership.
    BackReferenceMismatch {
        load_id: LoadId,
        back_reference: Option<CircuitId>,
        member_of: Vec<CircuitId>,
    },
}

impl Display for IntegrityViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCircuit { circuit_id } => write!(f, "circuit {circuit_id} has no loads"),
            Self::DuplicateIdentifier { identifier, count } => {
                write!(f, "identifier {identifier} used by {count} circuits")
            }
            Self::DanglingReference {
                from,
                from_id,
                to,
                to_id,
            } => write!(f, "{from} {from_id} references missing {to} {to_id}"),
            Self::BackReferenceMismatch {
                load_id,
                back_reference,
                member_of,
            } => write!(
                f,
                "load {load_id} back-reference {back_reference:?} disagrees with membership {member_of:?}"
            ),
        }
    }
}

/// Walks the whole aggregate and reports every broken graph invariant.
///
/// A consistent project yields an empty list.
pub fn audit(project: &Project) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();

    for location in &project.locations {
        if project.zone(location.zone_id).is_none() {
            violations.push(IntegrityViolation::DanglingReference {
                from: EntityKind::Location,
                from_id: location.id,
                to: EntityKind::Zone,
                to_id: location.zone_id,
            });
        }
    }

    let mut membership: HashMap<LoadId, Vec<CircuitId>> = HashMap::new();
    let mut identifiers: HashMap<String, usize> = HashMap::new();
    for circuit in &project.circuits {
        if circuit.load_ids.is_empty() {
            violations.push(IntegrityViolation::EmptyCircuit {
                circuit_id: circuit.id,
            });
        }
        *identifiers
            .entry(normalize_identifier(&circuit.identifier))
            .or_default() += 1;
        if project.zone(circuit.zone_id).is_none() {
            violations.push(IntegrityViolation::DanglingReference {
                from: EntityKind::Circuit,
                from_id: circuit.id,
                to: EntityKind::Zone,
                to_id: circuit.zone_id,
            });
        }
        if let Some(proposal_id) = circuit.proposal_id {
            if project.proposal(proposal_id).is_none() {
                violations.push(IntegrityViolation::DanglingReference {
                    from: EntityKind::Circuit,
                    from_id: circuit.id,
                    to: EntityKind::Proposal,
                    to_id: proposal_id,
                });
            }
        }
        let mut seen = HashSet::new();
        for load_id in &circuit.load_ids {
            if !seen.insert(*load_id) {
                continue;
            }
            if project.load(*load_id).is_none() {
                violations.push(IntegrityViolation::DanglingReference {
                    from: EntityKind::Circuit,
                    from_id: circuit.id,
                    to: EntityKind::Load,
                    to_id: *load_id,
                });
            }
            membership.entry(*load_id).or_default().push(circuit.id);
        }
    }

    let mut duplicates: Vec<_> = identifiers
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicates.sort();
    for (identifier, count) in duplicates {
        violations.push(IntegrityViolation::DuplicateIdentifier { identifier, count });
    }

    for load in &project.loads {
        if project.location(load.location_id).is_none() {
            violations.push(IntegrityViolation::DanglingReference {
                from: EntityKind::Load,
                from_id: load.id,
                to: EntityKind::Location,
                to_id: load.location_id,
            });
        }
        if let Some(zone_id) = load.zone_id {
            if project.zone(zone_id).is_none() {
                violations.push(IntegrityViolation::DanglingReference {
                    from: EntityKind::Load,
                    from_id: load.id,
                    to: EntityKind::Zone,
                    to_id: zone_id,
                });
            }
        }
        if let Some(circuit_id) = load.circuit_id {
            if project.circuit(circuit_id).is_none() {
                violations.push(IntegrityViolation::DanglingReference {
                    from: EntityKind::Load,
                    from_id: load.id,
                    to: EntityKind::Circuit,
                    to_id: circuit_id,
                });
            }
        }
        let member_of = membership.remove(&load.id).unwrap_or_default();
        let consistent = match load.circuit_id {
            Some(circuit_id) => member_of == [circuit_id],
            None => member_of.is_empty(),
        };
        if !consistent {
            violations.push(IntegrityViolation::BackReferenceMismatch {
                load_id: load.id,
                back_reference: load.circuit_id,
                member_of,
            });
        }
    }

    violations
}
