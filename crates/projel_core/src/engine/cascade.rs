//! Cascading deletion and circuit garbage collection.
//!
//! # Responsibility
//! - Remove entities together with everything that only exists through them.
//! - Drop circuits whose load set became empty in the same operation.
//!
//! # Invariants
//! - A deleted load disappears from every circuit and draft load set.
//! - Emptied circuits are collected; emptied drafts are kept.
//! - Zone and proposal deletion are guarded, never cascading.
//! - Proposal load sets are audit records and are not rewritten.

use super::integrity::zone_dependents;
use super::{EngineError, EngineResult, IntegrityError, Transition, Warning};
use crate::model::circuit::CircuitId;
use crate::model::load::LoadId;
use crate::model::location::LocationId;
use crate::model::project::Project;
use crate::model::proposal::ProposalId;
use crate::model::zone::ZoneId;
use crate::model::EntityKind;
use log::info;
use std::collections::HashSet;

/// Removes a location, all of its loads, and any circuit left empty.
///
/// The transition value is the number of loads removed with the location.
pub fn remove_location(
    project: &Project,
    location_id: LocationId,
) -> EngineResult<Transition<usize>> {
    if project.location(location_id).is_none() {
        return Err(EngineError::not_found(EntityKind::Location, location_id));
    }

    let mut next = project.clone();
    let removed: HashSet<LoadId> = next
        .loads_in_location(location_id)
        .map(|load| load.id)
        .collect();
    next.locations.retain(|location| location.id != location_id);
    next.loads.retain(|load| !removed.contains(&load.id));
    let warnings = purge_loads(&mut next, &removed);

    Ok(Transition::new(next, removed.len(), warnings))
}

/// Removes one load and any circuit it leaves empty.
pub fn remove_load(project: &Project, load_id: LoadId) -> EngineResult<Transition<()>> {
    if project.load(load_id).is_none() {
        return Err(EngineError::not_found(EntityKind::Load, load_id));
    }

    let mut next = project.clone();
    next.loads.retain(|load| load.id != load_id);
    let warnings = purge_loads(&mut next, &HashSet::from([load_id]));

    Ok(Transition::new(next, (), warnings))
}

/// Removes a circuit and clears the back-reference on its former loads.
pub fn remove_circuit(project: &Project, circuit_id: CircuitId) -> EngineResult<Transition<()>> {
    if project.circuit(circuit_id).is_none() {
        return Err(EngineError::not_found(EntityKind::Circuit, circuit_id));
    }

    let mut next = project.clone();
    next.circuits.retain(|circuit| circuit.id != circuit_id);
    clear_back_references(&mut next, circuit_id);

    Ok(Transition::quiet(next, ()))
}

/// Removes a zone nothing references any more.
pub fn remove_zone(project: &Project, zone_id: ZoneId) -> EngineResult<Transition<()>> {
    if project.zone(zone_id).is_none() {
        return Err(EngineError::not_found(EntityKind::Zone, zone_id));
    }
    let dependents = zone_dependents(project, zone_id);
    if !dependents.is_empty() {
        return Err(IntegrityError::ZoneInUse {
            zone_id,
            locations: dependents.locations,
            circuits: dependents.circuits,
            loads: dependents.loads,
        }
        .into());
    }

    let mut next = project.clone();
    next.zones.retain(|zone| zone.id != zone_id);
    Ok(Transition::quiet(next, ()))
}

/// Removes a proposal no circuit was formalized from.
pub fn remove_proposal(
    project: &Project,
    proposal_id: ProposalId,
) -> EngineResult<Transition<()>> {
    if project.proposal(proposal_id).is_none() {
        return Err(EngineError::not_found(EntityKind::Proposal, proposal_id));
    }
    let circuits = project
        .circuits
        .iter()
        .filter(|circuit| circuit.proposal_id == Some(proposal_id))
        .count();
    if circuits > 0 {
        return Err(IntegrityError::ProposalInUse {
            proposal_id,
            circuits,
        }
        .into());
    }

    let mut next = project.clone();
    next.proposals.retain(|proposal| proposal.id != proposal_id);
    Ok(Transition::quiet(next, ()))
}

/// Filters `removed` out of every draft and circuit, then collects the
/// circuits left empty.
pub(crate) fn purge_loads(project: &mut Project, removed: &HashSet<LoadId>) -> Vec<Warning> {
    if removed.is_empty() {
        return Vec::new();
    }
    for draft in &mut project.drafts {
        draft.load_ids.retain(|id| !removed.contains(id));
    }
    for circuit in &mut project.circuits {
        circuit.load_ids.retain(|id| !removed.contains(id));
    }
    collect_empty_circuits(project)
}

/// Drops every circuit with an empty load set, one warning per circuit.
pub(crate) fn collect_empty_circuits(project: &mut Project) -> Vec<Warning> {
    let (empty, live): (Vec<_>, Vec<_>) = std::mem::take(&mut project.circuits)
        .into_iter()
        .partition(|circuit| circuit.load_ids.is_empty());
    project.circuits = live;

    empty
        .into_iter()
        .map(|circuit| {
            clear_back_references(project, circuit.id);
            info!(
                "event=circuit_gc module=engine status=ok project_id={} circuit_id={}",
                project.id, circuit.id
            );
            Warning::CircuitCollected {
                circuit_id: circuit.id,
                identifier: circuit.identifier,
            }
        })
        .collect()
}

fn clear_back_references(project: &mut Project, circuit_id: CircuitId) {
    for load in &mut project.loads {
        if load.circuit_id == Some(circuit_id) {
            load.circuit_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{remove_circuit, remove_load, remove_location, remove_zone};
    use crate::engine::{EngineError, IntegrityError, Warning};
    use crate::model::circuit::{CircuitDraft, CircuitKind};
    use crate::model::load::{Load, LoadKind, PowerUnit};
    use crate::model::location::Location;
    use crate::model::project::{ElectricalSystem, Project};
    use crate::model::proposal::DraftGroup;
    use crate::model::zone::Zone;

    fn lamp(location_id: uuid::Uuid, name: &str) -> Load {
        Load::new(location_id, name, LoadKind::Lighting, 100.0, PowerUnit::VoltAmpere)
    }

    /// Two locations in one zone; `C1` holds loads of both, `C2` only the
    /// first location's load.
    fn fixture() -> Project {
        let mut project = Project::new("Casa", ElectricalSystem::default());
        let zone = Zone::new("Seca");
        let sala = Location::new(zone.id, "Sala", 12.0, 14.0);
        let quarto = Location::new(zone.id, "Quarto", 9.0, 12.0);
        let mut a = lamp(sala.id, "A");
        let mut b = lamp(quarto.id, "B");
        let mut c = Load::new(
            sala.id,
            "C",
            LoadKind::GeneralOutlet,
            600.0,
            PowerUnit::VoltAmpere,
        );
        let c1 = CircuitDraft::new("C1", CircuitKind::Lighting, zone.id)
            .with_loads(vec![a.id, b.id])
            .into_circuit();
        let c2 = CircuitDraft::new("C2", CircuitKind::GeneralOutlet, zone.id)
            .with_loads(vec![c.id])
            .into_circuit();
        a.circuit_id = Some(c1.id);
        b.circuit_id = Some(c1.id);
        c.circuit_id = Some(c2.id);
        let mut draft = DraftGroup::new("Pre 1");
        draft.load_ids = vec![a.id, c.id];

        project.zones.push(zone);
        project.locations.extend([sala, quarto]);
        project.loads.extend([a, b, c]);
        project.circuits.extend([c1, c2]);
        project.drafts.push(draft);
        project
    }

    #[test]
    fn remove_location_cascades_and_collects_emptied_circuit() {
        let project = fixture();
        let sala = project.locations[0].id;

        let transition = remove_location(&project, sala).unwrap();
        let next = transition.project;

        assert_eq!(transition.value, 2);
        assert_eq!(next.loads.len(), 1);
        assert_eq!(next.loads[0].name, "B");
        assert_eq!(next.circuits.len(), 1);
        assert_eq!(next.circuits[0].identifier, "C1");
        assert_eq!(next.circuits[0].load_ids, vec![next.loads[0].id]);
        assert!(next.drafts[0].load_ids.is_empty());
        assert!(matches!(
            transition.warnings.as_slice(),
            [Warning::CircuitCollected { identifier, .. }] if identifier == "C2"
        ));
        assert_eq!(project.loads.len(), 3);
    }

    #[test]
    fn remove_load_keeps_circuit_with_remaining_loads() {
        let project = fixture();
        let a = project.loads[0].id;

        let transition = remove_load(&project, a).unwrap();
        assert!(transition.warnings.is_empty());
        assert_eq!(transition.project.circuits.len(), 2);
        assert_eq!(transition.project.circuits[0].load_ids.len(), 1);
    }

    #[test]
    fn remove_circuit_clears_back_references() {
        let project = fixture();
        let c1 = project.circuits[0].id;

        let next = remove_circuit(&project, c1).unwrap().project;
        assert!(next.loads[0].circuit_id.is_none());
        assert!(next.loads[1].circuit_id.is_none());
        assert!(next.loads[2].circuit_id.is_some());
    }

    #[test]
    fn remove_zone_reports_dependent_counts() {
        let project = fixture();
        let zone_id = project.zones[0].id;

        let err = remove_zone(&project, zone_id).unwrap_err();
        assert_eq!(
            err,
            EngineError::Integrity(IntegrityError::ZoneInUse {
                zone_id,
                locations: 2,
                circuits: 2,
                loads: 0,
            })
        );
    }
}
