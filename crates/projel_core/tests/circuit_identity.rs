use projel_core::{
    CircuitDraft, CircuitKind, ElectricalSystem, EngineError, InMemoryProjectRepository,
    IntegrityError, Load, LoadKind, Location, PowerUnit, ProjectId, ProjectStore, StoreError,
    ValidationError, Zone, ZoneId,
};
use uuid::Uuid;

fn setup() -> (ProjectStore<InMemoryProjectRepository>, ProjectId, ZoneId, Vec<Uuid>) {
    let mut store = ProjectStore::new(InMemoryProjectRepository::new());
    let project_id = store
        .create_project("Casa", ElectricalSystem::default())
        .unwrap();
    let zone_id = store.add_zone(project_id, Zone::new("Seca")).unwrap().value;
    let location_id = store
        .add_location(project_id, Location::new(zone_id, "Sala", 12.0, 14.0))
        .unwrap()
        .value;
    let loads = (0..3)
        .map(|_| {
            let load = Load::new(
                location_id,
                "Lampada",
                LoadKind::Lighting,
                100.0,
                PowerUnit::VoltAmpere,
            );
            store.add_load(project_id, load).unwrap().value
        })
        .collect();
    (store, project_id, zone_id, loads)
}

fn circuit(identifier: &str, zone_id: ZoneId, load_ids: Vec<Uuid>) -> CircuitDraft {
    CircuitDraft::new(identifier, CircuitKind::Lighting, zone_id).with_loads(load_ids)
}

fn circuits_json(store: &ProjectStore<InMemoryProjectRepository>, project_id: ProjectId) -> String {
    serde_json::to_string(&store.project(project_id).unwrap().circuits).unwrap()
}

#[test]
fn identifiers_are_normalized_on_create() {
    let (mut store, project_id, zone_id, loads) = setup();
    let draft = circuit("  c1 ", zone_id, vec![loads[0]]);
    let circuit_id = store.add_circuit(project_id, draft).unwrap().value;

    let project = store.project(project_id).unwrap();
    assert_eq!(project.circuit(circuit_id).unwrap().identifier, "C1");
}

#[test]
fn duplicate_identifier_on_create_leaves_circuits_unchanged() {
    let (mut store, project_id, zone_id, loads) = setup();
    let first = circuit("C1", zone_id, vec![loads[0]]);
    store.add_circuit(project_id, first).unwrap();
    let before = circuits_json(&store, project_id);

    let clash = circuit(" c1", zone_id, vec![loads[1]]);
    let err = store.add_circuit(project_id, clash).unwrap_err();

    match err {
        StoreError::Engine(EngineError::Integrity(IntegrityError::DuplicateCircuitIdentifier {
            identifier,
        })) => assert_eq!(identifier, "C1"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(circuits_json(&store, project_id), before);
    let project = store.project(project_id).unwrap();
    assert_eq!(project.load(loads[1]).unwrap().circuit_id, None);
}

#[test]
fn duplicate_identifier_on_update_leaves_circuits_unchanged() {
    let (mut store, project_id, zone_id, loads) = setup();
    let c1 = circuit("C1", zone_id, vec![loads[0]]);
    store.add_circuit(project_id, c1).unwrap();
    let c2 = circuit("C2", zone_id, vec![loads[1]]);
    let c2_id = store.add_circuit(project_id, c2).unwrap().value;
    let before = circuits_json(&store, project_id);

    let mut renamed = store.project(project_id).unwrap().circuit(c2_id).unwrap().clone();
    renamed.identifier = "c1".to_string();
    renamed.load_ids.push(loads[2]);
    let err = store.update_circuit(project_id, renamed).unwrap_err();

    assert!(matches!(
        err,
        StoreError::Engine(EngineError::Integrity(
            IntegrityError::DuplicateCircuitIdentifier { .. }
        ))
    ));
    assert_eq!(circuits_json(&store, project_id), before);
}

#[test]
fn update_may_keep_its_own_identifier() {
    let (mut store, project_id, zone_id, loads) = setup();
    let draft = circuit("C1", zone_id, vec![loads[0]]);
    let circuit_id = store.add_circuit(project_id, draft).unwrap().value;

    let mut circuit = store.project(project_id).unwrap().circuit(circuit_id).unwrap().clone();
    circuit.identifier = "c1".to_string();
    circuit.description = "Sala".to_string();
    circuit.load_ids = vec![loads[1], loads[2]];
    store.update_circuit(project_id, circuit).unwrap();

    let project = store.project(project_id).unwrap();
    let circuit = project.circuit(circuit_id).unwrap();
    assert_eq!(circuit.identifier, "C1");
    assert_eq!(circuit.load_ids, vec![loads[1], loads[2]]);
    assert_eq!(project.load(loads[0]).unwrap().circuit_id, None);
    assert_eq!(project.load(loads[1]).unwrap().circuit_id, Some(circuit_id));
}

#[test]
fn blank_identifier_and_empty_load_set_are_rejected() {
    let (mut store, project_id, zone_id, loads) = setup();

    let blank = circuit("   ", zone_id, vec![loads[0]]);
    let err = store.add_circuit(project_id, blank).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Engine(EngineError::Validation(ValidationError::BlankIdentifier))
    ));

    let empty = CircuitDraft::new("C1", CircuitKind::Lighting, zone_id);
    let err = store.add_circuit(project_id, empty).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Engine(EngineError::Validation(ValidationError::EmptyLoadSet(_)))
    ));
    assert!(store.project(project_id).unwrap().circuits.is_empty());
}
