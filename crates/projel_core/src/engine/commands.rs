//! Create/update commands for zones, locations, loads and circuits.
//!
//! # Responsibility
//! - Validate one entity locally, then check its references.
//! - Fill the inherited zone of loads and keep circuit membership mirrored.
//!
//! # Invariants
//! - The inherited zone on a load is filled only when absent; it is never
//!   overwritten except through `refresh_inherited_zones`.
//! - Circuit identifiers are re-checked for uniqueness on every add/update.
//! - A circuit's proposal back-reference and snapshot are immutable.

use super::assignment::{assign, sync_membership};
use super::integrity::{
    ensure_identifier_available, ensure_loads_exist, ensure_location_exists, ensure_zone_exists,
};
use super::{EngineError, EngineResult, IntegrityError, Transition, Warning};
use crate::model::circuit::{Circuit, CircuitDraft, CircuitId};
use crate::model::load::{Load, LoadId};
use crate::model::location::{Location, LocationId};
use crate::model::project::{Project, ProjectPatch};
use crate::model::zone::{Zone, ZoneId};
use crate::model::EntityKind;

pub fn update_project(project: &Project, patch: &ProjectPatch) -> EngineResult<Transition<()>> {
    let next = project.merged(patch);
    next.validate()?;
    Ok(Transition::quiet(next, ()))
}

pub fn add_zone(project: &Project, zone: Zone) -> EngineResult<Transition<ZoneId>> {
    zone.validate()?;
    let id = zone.id;
    let mut next = project.clone();
    next.zones.push(zone);
    Ok(Transition::quiet(next, id))
}

pub fn update_zone(project: &Project, zone: Zone) -> EngineResult<Transition<()>> {
    zone.validate()?;
    let mut next = project.clone();
    let slot = next
        .zones
        .iter_mut()
        .find(|existing| existing.id == zone.id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Zone, zone.id))?;
    *slot = zone;
    Ok(Transition::quiet(next, ()))
}

pub fn add_location(
    project: &Project,
    location: Location,
) -> EngineResult<Transition<LocationId>> {
    location.validate()?;
    ensure_zone_exists(project, location.zone_id)?;
    let id = location.id;
    let mut next = project.clone();
    next.locations.push(location);
    Ok(Transition::quiet(next, id))
}

/// Replaces a location. Loads keep their inherited zone even when the
/// location moves to another zone.
pub fn update_location(project: &Project, location: Location) -> EngineResult<Transition<()>> {
    location.validate()?;
    ensure_zone_exists(project, location.zone_id)?;
    let mut next = project.clone();
    let slot = next
        .locations
        .iter_mut()
        .find(|existing| existing.id == location.id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Location, location.id))?;
    *slot = location;
    Ok(Transition::quiet(next, ()))
}

pub fn add_load(project: &Project, load: Load) -> EngineResult<Transition<LoadId>> {
    let mut next = project.clone();
    let (id, warnings) = insert_load(&mut next, load)?;
    Ok(Transition::new(next, id, warnings))
}

/// Adds several loads atomically: either all of them commit or none does.
pub fn add_loads(
    project: &Project,
    loads: Vec<Load>,
) -> EngineResult<Transition<Vec<LoadId>>> {
    let mut next = project.clone();
    let mut warnings = Vec::new();
    let mut ids = Vec::with_capacity(loads.len());
    for load in loads {
        let (id, load_warnings) = insert_load(&mut next, load)?;
        ids.push(id);
        warnings.extend(load_warnings);
    }
    Ok(Transition::new(next, ids, warnings))
}

fn insert_load(project: &mut Project, load: Load) -> EngineResult<(LoadId, Vec<Warning>)> {
    let (load, requested_circuit) = prepare_load(project, load)?;
    let id = load.id;
    project.loads.push(load);
    let warnings = match requested_circuit {
        Some(circuit_id) => assign(project, id, Some(circuit_id)).1,
        None => Vec::new(),
    };
    Ok((id, warnings))
}

/// Replaces a load. A changed circuit reference is routed through the
/// assignment engine so both sides of the membership stay in sync.
pub fn update_load(project: &Project, load: Load) -> EngineResult<Transition<()>> {
    let current = project
        .load(load.id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Load, load.id))?;
    let previous_circuit = current.circuit_id;
    let (mut load, requested_circuit) = prepare_load(project, load)?;
    load.circuit_id = previous_circuit;

    let id = load.id;
    let mut next = project.clone();
    if let Some(slot) = next.load_mut(id) {
        *slot = load;
    }
    let warnings = if requested_circuit != previous_circuit {
        assign(&mut next, id, requested_circuit).1
    } else {
        Vec::new()
    };
    Ok(Transition::new(next, (), warnings))
}

/// Validates a load and fills its inherited zone. Returns the load with no
/// circuit reference, plus the circuit the caller asked for.
fn prepare_load(
    project: &Project,
    mut load: Load,
) -> EngineResult<(Load, Option<CircuitId>)> {
    load.validate()?;
    ensure_location_exists(project, load.location_id)?;
    match load.zone_id {
        Some(zone_id) => ensure_zone_exists(project, zone_id)?,
        None => load.zone_id = project.location(load.location_id).map(|l| l.zone_id),
    }
    if let Some(circuit_id) = load.circuit_id {
        if project.circuit(circuit_id).is_none() {
            return Err(IntegrityError::DanglingReference {
                kind: EntityKind::Circuit,
                id: circuit_id,
            }
            .into());
        }
    }
    let requested = load.circuit_id.take();
    Ok((load, requested))
}

/// Rewrites the inherited zone of every load in `location_id` from the
/// location's current zone. Returns how many loads changed.
pub fn refresh_inherited_zones(
    project: &Project,
    location_id: LocationId,
) -> EngineResult<Transition<usize>> {
    let zone_id = project
        .location(location_id)
        .map(|location| location.zone_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Location, location_id))?;

    let mut next = project.clone();
    let mut changed = 0;
    for load in next
        .loads
        .iter_mut()
        .filter(|load| load.location_id == location_id)
    {
        if load.zone_id != Some(zone_id) {
            load.zone_id = Some(zone_id);
            changed += 1;
        }
    }
    Ok(Transition::quiet(next, changed))
}

pub fn add_circuit(
    project: &Project,
    draft: CircuitDraft,
) -> EngineResult<Transition<CircuitId>> {
    let identifier = ensure_identifier_available(project, &draft.identifier, None)?;
    ensure_zone_exists(project, draft.zone_id)?;
    let load_ids = dedup(&draft.load_ids);
    ensure_loads_exist(project, EntityKind::Circuit, &load_ids)?;

    let circuit = CircuitDraft {
        identifier,
        load_ids,
        ..draft
    }
    .into_circuit();
    circuit.validate()?;

    let id = circuit.id;
    let mut next = project.clone();
    next.circuits.push(circuit);
    let warnings = sync_membership(&mut next, id);
    Ok(Transition::new(next, id, warnings))
}

/// Replaces a circuit's editable attributes and load set.
///
/// Loads that leave the circuit are unassigned; loads that join leave
/// their previous circuit, which is collected if it empties.
pub fn update_circuit(project: &Project, circuit: Circuit) -> EngineResult<Transition<()>> {
    let current = project
        .circuit(circuit.id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Circuit, circuit.id))?;
    let identifier =
        ensure_identifier_available(project, &circuit.identifier, Some(circuit.id))?;
    ensure_zone_exists(project, circuit.zone_id)?;
    let load_ids = dedup(&circuit.load_ids);
    ensure_loads_exist(project, EntityKind::Circuit, &load_ids)?;

    let updated = Circuit {
        identifier,
        load_ids,
        proposal_id: current.proposal_id,
        snapshot: current.snapshot.clone(),
        created_at: current.created_at,
        ..circuit
    };
    updated.validate()?;

    let id = updated.id;
    let mut next = project.clone();
    if let Some(slot) = next.circuit_mut(id) {
        *slot = updated;
    }
    let warnings = sync_membership(&mut next, id);
    Ok(Transition::new(next, (), warnings))
}

/// Order-preserving duplicate removal.
pub(crate) fn dedup(ids: &[LoadId]) -> Vec<LoadId> {
    let mut out: Vec<LoadId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
