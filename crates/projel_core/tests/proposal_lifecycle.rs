use projel_core::{
    AnalysisError, AnalysisReport, AnalysisRequest, CircuitDraft, CircuitKind, ElectricalSystem,
    EngineError, InMemoryProjectRepository, IntegrityError, Load, LoadId, LoadKind, Location,
    PowerUnit, ProjectId, ProjectStore, ProposalAnalyzer, ProposalEdit, ProposalStatus,
    RuleBasedAnalyzer, StoreError, Warning, Zone, ZoneId,
};
use std::cell::Cell;

struct Fixture {
    store: ProjectStore<InMemoryProjectRepository>,
    project_id: ProjectId,
    seca: ZoneId,
    lamps: Vec<LoadId>,
    outlet: LoadId,
}

fn fixture() -> Fixture {
    let mut store = ProjectStore::new(InMemoryProjectRepository::new());
    let project_id = store
        .create_project("Casa", ElectricalSystem::default())
        .unwrap();
    let seca = store.add_zone(project_id, Zone::new("Seca")).unwrap().value;
    let sala = store
        .add_location(project_id, Location::new(seca, "Sala", 12.0, 14.0))
        .unwrap()
        .value;
    let mut add = |name: &str, kind: LoadKind, power: f64| {
        let load = Load::new(sala, name, kind, power, PowerUnit::VoltAmpere);
        store.add_load(project_id, load).unwrap().value
    };
    let lamps = vec![
        add("Lampada", LoadKind::Lighting, 100.0),
        add("Arandela", LoadKind::Lighting, 60.0),
    ];
    let outlet = add("Tomada", LoadKind::GeneralOutlet, 600.0);
    Fixture {
        store,
        project_id,
        seca,
        lamps,
        outlet,
    }
}

struct Unreachable {
    calls: Cell<usize>,
}

impl ProposalAnalyzer for Unreachable {
    fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        self.calls.set(self.calls.get() + 1);
        Err(AnalysisError::Unreachable("connection refused".to_string()))
    }
}

struct Rejecting;

impl ProposalAnalyzer for Rejecting {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        Ok(AnalysisReport {
            total_va: 0.0,
            total_w: 0.0,
            location_ids: Vec::new(),
            zone_ids: Vec::new(),
            alerts: vec![format!("{} cargas recusadas", request.loads.len())],
            is_valid: false,
        })
    }
}

#[test]
fn analyzed_proposal_formalizes_into_circuit_with_frozen_snapshot() {
    let mut f = fixture();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Iluminacao da sala", "Eng. Ana")
        .unwrap()
        .value;

    let analyzed = f
        .store
        .analyze_proposal(f.project_id, proposal_id, &RuleBasedAnalyzer)
        .unwrap();
    assert_eq!(analyzed.value, ProposalStatus::Analyzed);
    assert!(analyzed.warnings.is_empty());

    let draft = CircuitDraft::new(" c1 ", CircuitKind::Lighting, f.seca);
    let circuit_id = f
        .store
        .convert_proposal_to_circuit(f.project_id, proposal_id, draft)
        .unwrap()
        .value;

    let project = f.store.project(f.project_id).unwrap();
    let proposal = project.proposal(proposal_id).unwrap();
    let circuit = project.circuit(circuit_id).unwrap();
    assert_eq!(proposal.status, ProposalStatus::Accepted);
    assert_eq!(circuit.identifier, "C1");
    assert_eq!(circuit.load_ids, proposal.load_ids);
    assert_eq!(circuit.proposal_id, Some(proposal_id));
    for lamp in &f.lamps {
        assert_eq!(project.load(*lamp).unwrap().circuit_id, Some(circuit_id));
    }

    let snapshot = circuit.snapshot.clone().unwrap();
    assert_eq!(snapshot.id, proposal_id);
    assert_eq!(snapshot.status, ProposalStatus::Analyzed);
    assert_eq!(snapshot.load_ids, f.lamps);

    let edit = ProposalEdit {
        load_ids: Some(vec![f.outlet]),
        ..ProposalEdit::default()
    };
    let err = f
        .store
        .update_proposal(f.project_id, proposal_id, &edit)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Engine(EngineError::InvalidTransition {
            from: ProposalStatus::Accepted,
            ..
        })
    ));
    let project = f.store.project(f.project_id).unwrap();
    assert_eq!(project.circuit(circuit_id).unwrap().snapshot, Some(snapshot));
}

#[test]
fn draft_proposal_cannot_be_formalized() {
    let mut f = fixture();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Iluminacao", "Eng. Ana")
        .unwrap()
        .value;

    let draft = CircuitDraft::new("C1", CircuitKind::Lighting, f.seca);
    let err = f
        .store
        .convert_proposal_to_circuit(f.project_id, proposal_id, draft)
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Engine(EngineError::InvalidTransition {
            from: ProposalStatus::Draft,
            to: ProposalStatus::Accepted,
        })
    ));
    let project = f.store.project(f.project_id).unwrap();
    assert!(project.circuits.is_empty());
    assert_eq!(
        project.proposal(proposal_id).unwrap().status,
        ProposalStatus::Draft
    );
}

#[test]
fn failed_formalization_changes_nothing() {
    let mut f = fixture();
    let taken = CircuitDraft::new("C1", CircuitKind::GeneralOutlet, f.seca)
        .with_loads(vec![f.outlet]);
    f.store.add_circuit(f.project_id, taken).unwrap();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Iluminacao", "Eng. Ana")
        .unwrap()
        .value;
    f.store
        .analyze_proposal(f.project_id, proposal_id, &RuleBasedAnalyzer)
        .unwrap();
    let before = f.store.project(f.project_id).unwrap().clone();

    let clash = CircuitDraft::new("c1", CircuitKind::Lighting, f.seca);
    let err = f
        .store
        .convert_proposal_to_circuit(f.project_id, proposal_id, clash)
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Engine(EngineError::Integrity(
            IntegrityError::DuplicateCircuitIdentifier { .. }
        ))
    ));
    let after = f.store.project(f.project_id).unwrap();
    assert_eq!(after.circuits, before.circuits);
    assert_eq!(after.proposals, before.proposals);
}

#[test]
fn analysis_failure_leaves_proposal_in_draft() {
    let mut f = fixture();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Iluminacao", "Eng. Ana")
        .unwrap()
        .value;
    let analyzer = Unreachable {
        calls: Cell::new(0),
    };

    let err = f
        .store
        .analyze_proposal(f.project_id, proposal_id, &analyzer)
        .unwrap_err();

    assert!(matches!(err, StoreError::Analysis(AnalysisError::Unreachable(_))));
    assert_eq!(analyzer.calls.get(), 1);
    let proposal = f
        .store
        .project(f.project_id)
        .unwrap()
        .proposal(proposal_id)
        .unwrap();
    assert_eq!(proposal.status, ProposalStatus::Draft);
    assert_eq!(proposal.normative_notes, None);
}

#[test]
fn analysis_alerts_are_stored_and_surfaced() {
    let mut f = fixture();
    let mixed = vec![f.lamps[0], f.outlet];
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &mixed, "Sala", "Eng. Ana")
        .unwrap()
        .value;

    let applied = f
        .store
        .analyze_proposal(f.project_id, proposal_id, &RuleBasedAnalyzer)
        .unwrap();

    assert_eq!(applied.value, ProposalStatus::Analyzed);
    assert!(matches!(
        applied.warnings.as_slice(),
        [Warning::NormativeAlert { proposal_id: id, .. }] if *id == proposal_id
    ));
    let proposal = f
        .store
        .project(f.project_id)
        .unwrap()
        .proposal(proposal_id)
        .unwrap();
    assert!(proposal
        .normative_notes
        .as_deref()
        .unwrap()
        .contains("NBR 5410"));
}

#[test]
fn invalid_report_marks_proposal_invalid_and_blocks_further_analysis() {
    let mut f = fixture();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Sala", "Eng. Ana")
        .unwrap()
        .value;

    let applied = f
        .store
        .analyze_proposal(f.project_id, proposal_id, &Rejecting)
        .unwrap();
    assert_eq!(applied.value, ProposalStatus::Invalid);

    let analyzer = Unreachable {
        calls: Cell::new(0),
    };
    let err = f
        .store
        .analyze_proposal(f.project_id, proposal_id, &analyzer)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Engine(EngineError::InvalidTransition { .. })
    ));
    assert_eq!(analyzer.calls.get(), 0);

    f.store.discard_proposal(f.project_id, proposal_id).unwrap();
    let project = f.store.project(f.project_id).unwrap();
    assert_eq!(
        project.proposal(proposal_id).unwrap().status,
        ProposalStatus::Discarded
    );
}

#[test]
fn editing_load_set_returns_proposal_to_draft() {
    let mut f = fixture();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Sala", "Eng. Ana")
        .unwrap()
        .value;
    f.store
        .analyze_proposal(f.project_id, proposal_id, &RuleBasedAnalyzer)
        .unwrap();

    let edit = ProposalEdit {
        load_ids: Some(vec![f.lamps[0]]),
        intent: Some("Somente a lampada".to_string()),
        ..ProposalEdit::default()
    };
    f.store
        .update_proposal(f.project_id, proposal_id, &edit)
        .unwrap();

    let proposal = f
        .store
        .project(f.project_id)
        .unwrap()
        .proposal(proposal_id)
        .unwrap();
    assert_eq!(proposal.status, ProposalStatus::Draft);
    assert_eq!(proposal.load_ids, vec![f.lamps[0]]);
    assert_eq!(proposal.intent, "Somente a lampada");
}

#[test]
fn formalized_proposal_cannot_be_removed() {
    let mut f = fixture();
    let proposal_id = f
        .store
        .add_proposal(f.project_id, &f.lamps, "Sala", "Eng. Ana")
        .unwrap()
        .value;
    f.store
        .analyze_proposal(f.project_id, proposal_id, &RuleBasedAnalyzer)
        .unwrap();
    let draft = CircuitDraft::new("C1", CircuitKind::Lighting, f.seca);
    let circuit_id = f
        .store
        .convert_proposal_to_circuit(f.project_id, proposal_id, draft)
        .unwrap()
        .value;

    let err = f
        .store
        .remove_proposal(f.project_id, proposal_id)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Engine(EngineError::Integrity(IntegrityError::ProposalInUse {
            circuits: 1,
            ..
        }))
    ));

    f.store.remove_circuit(f.project_id, circuit_id).unwrap();
    f.store.remove_proposal(f.project_id, proposal_id).unwrap();
    assert!(f.store.project(f.project_id).unwrap().proposals.is_empty());
}
