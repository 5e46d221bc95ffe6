//! Load-to-circuit assignment with soft type validation.
//!
//! # Responsibility
//! - Move a load between "unassigned" and a circuit.
//! - Keep circuit load sets and load back-references mirrored.
//! - Flag circuit/load kind mismatches without ever blocking on them.
//!
//! # Invariants
//! - A load belongs to at most one circuit; joining one leaves the others.
//! - Circuits emptied by a move are collected in the same operation.

use super::cascade::collect_empty_circuits;
use super::{Transition, Warning};
use crate::model::circuit::{Circuit, CircuitId, CircuitKind};
use crate::model::load::{Load, LoadId, LoadKind};
use crate::model::project::Project;

/// Assigns `load_id` to `target`, or unassigns it when `target` is `None`.
///
/// Unknown load or circuit ids make this a no-op; the transition value tells
/// whether anything was applied.
pub fn set_load_circuit(
    project: &Project,
    load_id: LoadId,
    target: Option<CircuitId>,
) -> Transition<bool> {
    let mut next = project.clone();
    let (applied, warnings) = assign(&mut next, load_id, target);
    Transition::new(next, applied, warnings)
}

/// In-place form of `set_load_circuit`, shared with the load commands.
pub(crate) fn assign(
    project: &mut Project,
    load_id: LoadId,
    target: Option<CircuitId>,
) -> (bool, Vec<Warning>) {
    if project.load(load_id).is_none() {
        return (false, Vec::new());
    }

    let mut warnings = Vec::new();
    if let Some(circuit_id) = target {
        let (Some(circuit), Some(load)) = (project.circuit(circuit_id), project.load(load_id))
        else {
            return (false, Vec::new());
        };
        warnings.extend(kind_mismatch(circuit, load));
        if let Some(circuit) = project.circuit_mut(circuit_id) {
            if !circuit.contains_load(load_id) {
                circuit.load_ids.push(load_id);
            }
        }
    }

    detach_from_circuits(project, load_id, target);
    if let Some(load) = project.load_mut(load_id) {
        load.circuit_id = target;
    }
    warnings.extend(collect_empty_circuits(project));
    (true, warnings)
}

/// Mirrors the load set of `circuit_id` onto load back-references.
///
/// Member loads leave every other circuit and point at this one; loads that
/// pointed here but are no longer members are unassigned. Returns one
/// mismatch warning per member load plus collection warnings.
pub(crate) fn sync_membership(project: &mut Project, circuit_id: CircuitId) -> Vec<Warning> {
    let Some(circuit) = project.circuit(circuit_id) else {
        return Vec::new();
    };
    let members = circuit.load_ids.clone();
    let mut warnings: Vec<Warning> = members
        .iter()
        .filter_map(|id| project.load(*id))
        .filter_map(|load| kind_mismatch(circuit, load))
        .collect();

    for load_id in &members {
        detach_from_circuits(project, *load_id, Some(circuit_id));
    }
    for load in &mut project.loads {
        if members.contains(&load.id) {
            load.circuit_id = Some(circuit_id);
        } else if load.circuit_id == Some(circuit_id) {
            load.circuit_id = None;
        }
    }

    warnings.extend(collect_empty_circuits(project));
    warnings
}

/// Removes `load_id` from every circuit except `keep`.
fn detach_from_circuits(project: &mut Project, load_id: LoadId, keep: Option<CircuitId>) {
    for circuit in &mut project.circuits {
        if Some(circuit.id) != keep {
            circuit.load_ids.retain(|id| *id != load_id);
        }
    }
}

/// Soft heuristic: is this load an unusual member of this circuit kind?
pub fn is_kind_mismatch(circuit_kind: CircuitKind, load_kind: LoadKind) -> bool {
    match circuit_kind {
        CircuitKind::Lighting => load_kind != LoadKind::Lighting,
        CircuitKind::GeneralOutlet => load_kind != LoadKind::GeneralOutlet,
        CircuitKind::DedicatedOutlet => !load_kind.needs_exclusive_circuit(),
        CircuitKind::Distribution | CircuitKind::Motor => false,
    }
}

fn kind_mismatch(circuit: &Circuit, load: &Load) -> Option<Warning> {
    is_kind_mismatch(circuit.kind, load.kind).then(|| Warning::CircuitTypeMismatch {
        circuit_id: circuit.id,
        circuit_kind: circuit.kind,
        load_id: load.id,
        load_kind: load.kind,
    })
}
