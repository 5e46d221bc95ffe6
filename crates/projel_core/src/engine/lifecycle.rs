//! Proposal lifecycle and formalization into circuits.
//!
//! # Responsibility
//! - Create and edit proposals, deriving the locations and zones they touch.
//! - Record external analysis outcomes on a proposal.
//! - Convert an analyzed proposal into a definitive circuit.
//!
//! # Invariants
//! - Status moves follow `ProposalStatus::can_transition_to`.
//! - Formalization either creates the circuit and accepts the proposal, or
//!   changes nothing.
//! - The circuit snapshot is an owned copy; later proposal edits cannot
//!   reach it.

use super::assignment::sync_membership;
use super::commands::dedup;
use super::integrity::{ensure_identifier_available, ensure_loads_exist, ensure_zone_exists};
use super::{EngineError, EngineResult, Transition, Warning};
use crate::advisory::analysis::{AnalysisReport, AnalysisRequest};
use crate::model::circuit::{CircuitDraft, CircuitId};
use crate::model::load::LoadId;
use crate::model::location::LocationId;
use crate::model::project::Project;
use crate::model::proposal::{Proposal, ProposalId, ProposalStatus};
use crate::model::zone::ZoneId;
use crate::model::{EntityKind, ValidationError};

/// Separator between alerts stored in `observacoes_normativas`.
pub const ALERT_SEPARATOR: &str = " | ";

/// Partial edit of a proposal. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalEdit {
    pub load_ids: Option<Vec<LoadId>>,
    pub intent: Option<String>,
    pub author: Option<String>,
}

/// Creates a draft proposal over existing loads.
pub fn add_proposal(
    project: &Project,
    load_ids: &[LoadId],
    intent: &str,
    author: &str,
) -> EngineResult<Transition<ProposalId>> {
    let load_ids = dedup(load_ids);
    ensure_loads_exist(project, EntityKind::Proposal, &load_ids)?;

    let mut proposal = Proposal::new(load_ids, intent.trim(), author.trim());
    let (location_ids, zone_ids) = touched_by(project, &proposal.load_ids);
    proposal.location_ids = location_ids;
    proposal.zone_ids = zone_ids;
    proposal.validate()?;

    let id = proposal.id;
    let mut next = project.clone();
    next.proposals.push(proposal);
    Ok(Transition::quiet(next, id))
}

/// Edits a proposal that is not yet accepted or discarded.
///
/// Changing the load set re-derives the touched ids, drops the previous
/// analysis notes and returns the proposal to `draft`.
pub fn update_proposal(
    project: &Project,
    proposal_id: ProposalId,
    edit: &ProposalEdit,
) -> EngineResult<Transition<()>> {
    let current = find(project, proposal_id)?;
    if !current.status.is_editable() {
        return Err(EngineError::InvalidTransition {
            from: current.status,
            to: ProposalStatus::Draft,
        });
    }

    let mut updated = current.clone();
    if let Some(load_ids) = &edit.load_ids {
        let load_ids = dedup(load_ids);
        ensure_loads_exist(project, EntityKind::Proposal, &load_ids)?;
        let (location_ids, zone_ids) = touched_by(project, &load_ids);
        updated.load_ids = load_ids;
        updated.location_ids = location_ids;
        updated.zone_ids = zone_ids;
        updated.normative_notes = None;
        updated.status = ProposalStatus::Draft;
    }
    if let Some(intent) = &edit.intent {
        updated.intent = intent.trim().to_string();
    }
    if let Some(author) = &edit.author {
        updated.author = author.trim().to_string();
    }
    updated.validate()?;

    let mut next = project.clone();
    if let Some(slot) = next.proposal_mut(proposal_id) {
        *slot = updated;
    }
    Ok(Transition::quiet(next, ()))
}

/// Builds the payload sent to the external analysis service.
///
/// Loads deleted since the proposal was created are left out.
pub fn analysis_request(
    project: &Project,
    proposal_id: ProposalId,
) -> EngineResult<AnalysisRequest> {
    let proposal = find(project, proposal_id)?;
    let loads = proposal
        .load_ids
        .iter()
        .filter_map(|id| project.load(*id))
        .cloned()
        .collect();
    Ok(AnalysisRequest {
        loads,
        zones: project.zones.clone(),
    })
}

/// Stores an analysis outcome on the proposal without touching membership.
///
/// The proposal becomes `analyzed`, or `invalid` when the report says the
/// grouping cannot stand. Each alert is also surfaced as a warning.
pub fn record_analysis(
    project: &Project,
    proposal_id: ProposalId,
    report: &AnalysisReport,
) -> EngineResult<Transition<ProposalStatus>> {
    let current = find(project, proposal_id)?;
    let target = if report.is_valid {
        ProposalStatus::Analyzed
    } else {
        ProposalStatus::Invalid
    };
    if !current.status.can_transition_to(target) {
        return Err(EngineError::InvalidTransition {
            from: current.status,
            to: target,
        });
    }

    let mut next = project.clone();
    if let Some(proposal) = next.proposal_mut(proposal_id) {
        proposal.status = target;
        proposal.location_ids = report.location_ids.clone();
        proposal.zone_ids = report.zone_ids.clone();
        proposal.normative_notes =
            (!report.alerts.is_empty()).then(|| report.alerts.join(ALERT_SEPARATOR));
    }
    let warnings = report
        .alerts
        .iter()
        .map(|message| Warning::NormativeAlert {
            proposal_id,
            message: message.clone(),
        })
        .collect();
    Ok(Transition::new(next, target, warnings))
}

pub fn discard_proposal(
    project: &Project,
    proposal_id: ProposalId,
) -> EngineResult<Transition<()>> {
    let current = find(project, proposal_id)?;
    if !current.status.can_transition_to(ProposalStatus::Discarded) {
        return Err(EngineError::InvalidTransition {
            from: current.status,
            to: ProposalStatus::Discarded,
        });
    }

    let mut next = project.clone();
    if let Some(proposal) = next.proposal_mut(proposal_id) {
        proposal.status = ProposalStatus::Discarded;
    }
    Ok(Transition::quiet(next, ()))
}

/// Formalizes an analyzed proposal into a new circuit.
///
/// `draft.load_ids` is ignored: the circuit takes the proposal's live loads.
/// The proposal stays in the project as an audit record with status
/// `accepted`, and the circuit keeps a frozen copy of it.
pub fn convert_proposal_to_circuit(
    project: &Project,
    proposal_id: ProposalId,
    draft: CircuitDraft,
) -> EngineResult<Transition<CircuitId>> {
    let proposal = find(project, proposal_id)?;
    let identifier = ensure_identifier_available(project, &draft.identifier, None)?;
    if !proposal.status.can_transition_to(ProposalStatus::Accepted) {
        return Err(EngineError::InvalidTransition {
            from: proposal.status,
            to: ProposalStatus::Accepted,
        });
    }
    ensure_zone_exists(project, draft.zone_id)?;
    let load_ids: Vec<LoadId> = proposal
        .load_ids
        .iter()
        .copied()
        .filter(|id| project.load(*id).is_some())
        .collect();
    if load_ids.is_empty() {
        return Err(ValidationError::EmptyLoadSet(EntityKind::Circuit).into());
    }

    let mut circuit = CircuitDraft {
        identifier,
        load_ids,
        ..draft
    }
    .into_circuit();
    circuit.proposal_id = Some(proposal_id);
    circuit.snapshot = Some(proposal.clone());
    circuit.validate()?;

    let id = circuit.id;
    let mut next = project.clone();
    next.circuits.push(circuit);
    if let Some(proposal) = next.proposal_mut(proposal_id) {
        proposal.status = ProposalStatus::Accepted;
    }
    let warnings = sync_membership(&mut next, id);
    Ok(Transition::new(next, id, warnings))
}

/// Distinct locations and zones touched by `load_ids`, in first-seen order.
///
/// A load without an inherited zone contributes its location's zone.
pub fn touched_by(project: &Project, load_ids: &[LoadId]) -> (Vec<LocationId>, Vec<ZoneId>) {
    let mut locations = Vec::new();
    let mut zones = Vec::new();
    for load in load_ids.iter().filter_map(|id| project.load(*id)) {
        if !locations.contains(&load.location_id) {
            locations.push(load.location_id);
        }
        let zone = load.zone_id.or_else(|| {
            project
                .location(load.location_id)
                .map(|location| location.zone_id)
        });
        if let Some(zone) = zone {
            if !zones.contains(&zone) {
                zones.push(zone);
            }
        }
    }
    (locations, zones)
}

fn find(project: &Project, proposal_id: ProposalId) -> EngineResult<&Proposal> {
    project
        .proposal(proposal_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Proposal, proposal_id))
}

#[cfg(test)]
mod tests {
    use super::{
        add_proposal, convert_proposal_to_circuit, discard_proposal, record_analysis,
        update_proposal, ProposalEdit,
    };
    use crate::advisory::analysis::AnalysisReport;
    use crate::engine::{EngineError, IntegrityError, Warning};
    use crate::model::circuit::{CircuitDraft, CircuitKind};
    use crate::model::load::{Load, LoadKind, PowerUnit};
    use crate::model::location::Location;
    use crate::model::project::{ElectricalSystem, Project};
    use crate::model::proposal::ProposalStatus;
    use crate::model::zone::Zone;

    fn fixture() -> Project {
        let mut project = Project::new("Casa", ElectricalSystem::default());
        let zone = Zone::new("Seca");
        let sala = Location::new(zone.id, "Sala", 12.0, 14.0);
        let mut lamp = Load::new(
            sala.id,
            "Lampada",
            LoadKind::Lighting,
            100.0,
            PowerUnit::VoltAmpere,
        );
        lamp.zone_id = Some(zone.id);
        project.zones.push(zone);
        project.locations.push(sala);
        project.loads.push(lamp);
        project
    }

    fn clean_report(project: &Project) -> AnalysisReport {
        AnalysisReport {
            total_va: 100.0,
            total_w: 100.0,
            location_ids: vec![project.locations[0].id],
            zone_ids: vec![project.zones[0].id],
            alerts: Vec::new(),
            is_valid: true,
        }
    }

    fn analyzed(project: &Project) -> (Project, uuid::Uuid) {
        let load_id = project.loads[0].id;
        let created = add_proposal(project, &[load_id], "Iluminacao sala", "eng").unwrap();
        let id = created.value;
        let report = clean_report(&created.project);
        let next = record_analysis(&created.project, id, &report).unwrap().project;
        (next, id)
    }

    #[test]
    fn add_proposal_derives_touched_ids() {
        let project = fixture();
        let load_id = project.loads[0].id;
        let transition = add_proposal(&project, &[load_id], "  Sala ", "eng").unwrap();

        let proposal = transition.project.proposal(transition.value).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        assert_eq!(proposal.intent, "Sala");
        assert_eq!(proposal.location_ids, vec![project.locations[0].id]);
        assert_eq!(proposal.zone_ids, vec![project.zones[0].id]);
    }

    #[test]
    fn record_analysis_joins_alerts_and_warns() {
        let project = fixture();
        let load_id = project.loads[0].id;
        let created = add_proposal(&project, &[load_id], "Sala", "eng").unwrap();
        let mut report = clean_report(&created.project);
        report.alerts = vec!["primeiro".to_string(), "segundo".to_string()];

        let transition = record_analysis(&created.project, created.value, &report).unwrap();
        assert_eq!(transition.value, ProposalStatus::Analyzed);
        assert_eq!(transition.warnings.len(), 2);
        assert!(matches!(
            &transition.warnings[0],
            Warning::NormativeAlert { message, .. } if message == "primeiro"
        ));
        let proposal = transition.project.proposal(created.value).unwrap();
        assert_eq!(
            proposal.normative_notes.as_deref(),
            Some("primeiro | segundo")
        );
    }

    #[test]
    fn conversion_requires_analyzed_status() {
        let project = fixture();
        let load_id = project.loads[0].id;
        let created = add_proposal(&project, &[load_id], "Sala", "eng").unwrap();
        let draft = CircuitDraft::new("C1", CircuitKind::Lighting, project.zones[0].id);

        let err =
            convert_proposal_to_circuit(&created.project, created.value, draft).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTransition {
                from: ProposalStatus::Draft,
                to: ProposalStatus::Accepted,
            }
        );
    }

    #[test]
    fn conversion_accepts_proposal_and_snapshots_it() {
        let (project, proposal_id) = analyzed(&fixture());
        let draft = CircuitDraft::new(" c1", CircuitKind::Lighting, project.zones[0].id);

        let transition = convert_proposal_to_circuit(&project, proposal_id, draft).unwrap();
        let next = transition.project;
        let circuit = next.circuit(transition.value).unwrap();
        let proposal = next.proposal(proposal_id).unwrap();

        assert_eq!(proposal.status, ProposalStatus::Accepted);
        assert_eq!(circuit.identifier, "C1");
        assert_eq!(circuit.load_ids, proposal.load_ids);
        assert_eq!(circuit.proposal_id, Some(proposal_id));
        assert_eq!(
            circuit.snapshot.as_ref().map(|snapshot| snapshot.id),
            Some(proposal_id)
        );
        assert_eq!(next.loads[0].circuit_id, Some(circuit.id));
    }

    #[test]
    fn conversion_with_taken_identifier_changes_nothing() {
        let (project, proposal_id) = analyzed(&fixture());
        let zone_id = project.zones[0].id;
        let first = convert_proposal_to_circuit(
            &project,
            proposal_id,
            CircuitDraft::new("C1", CircuitKind::Lighting, zone_id),
        )
        .unwrap()
        .project;
        let (second_base, second_id) = analyzed(&first);

        let err = convert_proposal_to_circuit(
            &second_base,
            second_id,
            CircuitDraft::new("c1 ", CircuitKind::Lighting, zone_id),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Integrity(IntegrityError::DuplicateCircuitIdentifier { .. })
        ));
        assert_eq!(
            second_base.proposal(second_id).unwrap().status,
            ProposalStatus::Analyzed
        );
    }

    #[test]
    fn accepted_proposal_rejects_edits_and_discard() {
        let (project, proposal_id) = analyzed(&fixture());
        let draft = CircuitDraft::new("C1", CircuitKind::Lighting, project.zones[0].id);
        let accepted = convert_proposal_to_circuit(&project, proposal_id, draft)
            .unwrap()
            .project;

        let edit = ProposalEdit {
            intent: Some("outra".to_string()),
            ..ProposalEdit::default()
        };
        assert!(matches!(
            update_proposal(&accepted, proposal_id, &edit).unwrap_err(),
            EngineError::InvalidTransition {
                from: ProposalStatus::Accepted,
                ..
            }
        ));
        assert!(discard_proposal(&accepted, proposal_id).is_err());
    }

    #[test]
    fn editing_load_set_returns_proposal_to_draft() {
        let (project, proposal_id) = analyzed(&fixture());
        let load_id = project.loads[0].id;
        let edit = ProposalEdit {
            load_ids: Some(vec![load_id]),
            ..ProposalEdit::default()
        };

        let next = update_proposal(&project, proposal_id, &edit).unwrap().project;
        let proposal = next.proposal(proposal_id).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        assert!(proposal.normative_notes.is_none());
    }
}
