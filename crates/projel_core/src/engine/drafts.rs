//! Client-local draft groupings ("pre-circuits").
//!
//! # Responsibility
//! - Sketch load groupings before they become proposals.
//! - Suggest obvious groupings for loads not yet placed anywhere.
//! - Turn a draft into an analyzed proposal.
//!
//! # Invariants
//! - A load sits in at most one draft.
//! - Drafts may be empty and are never persisted.
//! - Draft edits never touch circuits or load back-references.

use super::integrity::ensure_loads_exist;
use super::lifecycle::ALERT_SEPARATOR;
use super::{EngineError, EngineResult, Transition};
use crate::advisory::analysis::AnalysisReport;
use crate::model::load::{LoadId, LoadKind};
use crate::model::project::Project;
use crate::model::proposal::{DraftGroup, DraftId, Proposal, ProposalId, ProposalStatus};
use crate::model::{is_blank, EntityKind, ValidationError};
use std::collections::HashSet;

/// Author recorded on proposals submitted from assistant-suggested drafts.
pub const ASSISTANT_AUTHOR: &str = "Assistente NBR5410";
/// Observation stored when a submitted grouping raised no alert.
pub const CLEAN_GROUPING_NOTE: &str = "Agrupamento manual válido.";

const EXCLUSIVE_RATIONALE: &str =
    "NBR 5410 exige circuito exclusivo para equipamentos de uso específico.";
const LIGHTING_RATIONALE: &str =
    "Recomendação: Agrupar pontos de iluminação separados das tomadas.";

/// Where `move_loads` puts the selected loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftTarget {
    /// Back to the free pool (no draft).
    Pool,
    Draft(DraftId),
}

/// Appends an empty draft named `name`.
pub fn add_draft(project: &Project, name: &str) -> EngineResult<Transition<DraftId>> {
    if is_blank(name) {
        return Err(ValidationError::BlankName(EntityKind::Draft).into());
    }
    let draft = DraftGroup::new(name.trim());
    let id = draft.id;
    let mut next = project.clone();
    next.drafts.push(draft);
    Ok(Transition::quiet(next, id))
}

pub fn rename_draft(
    project: &Project,
    draft_id: DraftId,
    name: &str,
) -> EngineResult<Transition<()>> {
    if is_blank(name) {
        return Err(ValidationError::BlankName(EntityKind::Draft).into());
    }
    let mut next = project.clone();
    let draft = next
        .draft_mut(draft_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Draft, draft_id))?;
    draft.name = name.trim().to_string();
    Ok(Transition::quiet(next, ()))
}

/// Drops a draft; its loads return to the pool.
pub fn remove_draft(project: &Project, draft_id: DraftId) -> EngineResult<Transition<()>> {
    if project.draft(draft_id).is_none() {
        return Err(EngineError::not_found(EntityKind::Draft, draft_id));
    }
    let mut next = project.clone();
    next.drafts.retain(|draft| draft.id != draft_id);
    Ok(Transition::quiet(next, ()))
}

/// Moves loads out of every draft, then into `target`.
pub fn move_loads(
    project: &Project,
    load_ids: &[LoadId],
    target: DraftTarget,
) -> EngineResult<Transition<()>> {
    if let Some(missing) = load_ids.iter().find(|id| project.load(**id).is_none()) {
        return Err(EngineError::not_found(EntityKind::Load, *missing));
    }
    if let DraftTarget::Draft(draft_id) = target {
        if project.draft(draft_id).is_none() {
            return Err(EngineError::not_found(EntityKind::Draft, draft_id));
        }
    }

    let moving: HashSet<LoadId> = load_ids.iter().copied().collect();
    let mut next = project.clone();
    for draft in &mut next.drafts {
        draft.load_ids.retain(|id| !moving.contains(id));
    }
    if let DraftTarget::Draft(draft_id) = target {
        if let Some(draft) = next.draft_mut(draft_id) {
            for id in load_ids {
                if !draft.load_ids.contains(id) {
                    draft.load_ids.push(*id);
                }
            }
        }
    }
    Ok(Transition::quiet(next, ()))
}

/// Loads in no circuit and no draft, in collection order.
pub fn free_loads(project: &Project) -> Vec<LoadId> {
    let in_circuits: HashSet<LoadId> = project
        .circuits
        .iter()
        .flat_map(|circuit| circuit.load_ids.iter().copied())
        .collect();
    let in_drafts: HashSet<LoadId> = project
        .drafts
        .iter()
        .flat_map(|draft| draft.load_ids.iter().copied())
        .collect();
    project
        .loads
        .iter()
        .map(|load| load.id)
        .filter(|id| !in_circuits.contains(id) && !in_drafts.contains(id))
        .collect()
}

/// Proposes drafts for the free loads: one per dedicated/motor load and one
/// holding every free lighting load. New drafts go before existing ones.
pub fn suggest_drafts(project: &Project) -> Transition<Vec<DraftId>> {
    let free = free_loads(project);
    let mut suggested = Vec::new();

    for load in free.iter().filter_map(|id| project.load(*id)) {
        if load.kind.needs_exclusive_circuit() {
            let mut draft = DraftGroup::new(format!("Circuito Específico - {}", load.name));
            draft.load_ids.push(load.id);
            draft.rationale = Some(EXCLUSIVE_RATIONALE.to_string());
            suggested.push(draft);
        }
    }

    let lighting: Vec<LoadId> = free
        .iter()
        .filter_map(|id| project.load(*id))
        .filter(|load| load.kind == LoadKind::Lighting)
        .map(|load| load.id)
        .collect();
    if !lighting.is_empty() {
        let mut draft = DraftGroup::new("Iluminação Geral");
        draft.load_ids = lighting;
        draft.rationale = Some(LIGHTING_RATIONALE.to_string());
        suggested.push(draft);
    }

    let ids = suggested.iter().map(|draft| draft.id).collect();
    let mut next = project.clone();
    suggested.append(&mut next.drafts);
    next.drafts = suggested;
    Transition::quiet(next, ids)
}

/// Creates an analyzed proposal from a non-empty draft and a local analysis
/// of its loads. The draft itself is kept until the caller removes it.
pub fn submit_draft(
    project: &Project,
    draft_id: DraftId,
    author: &str,
    report: &AnalysisReport,
) -> EngineResult<Transition<ProposalId>> {
    let draft = project
        .draft(draft_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Draft, draft_id))?;
    ensure_loads_exist(project, EntityKind::Draft, &draft.load_ids)?;

    let notes: Vec<&str> = draft
        .rationale
        .iter()
        .map(String::as_str)
        .chain(report.alerts.iter().map(String::as_str))
        .collect();
    let author = if draft.rationale.is_some() {
        ASSISTANT_AUTHOR
    } else {
        author.trim()
    };

    let mut proposal = Proposal::new(draft.load_ids.clone(), draft.name.clone(), author);
    proposal.status = ProposalStatus::Analyzed;
    proposal.location_ids = report.location_ids.clone();
    proposal.zone_ids = report.zone_ids.clone();
    proposal.normative_notes = Some(if notes.is_empty() {
        CLEAN_GROUPING_NOTE.to_string()
    } else {
        notes.join(ALERT_SEPARATOR)
    });
    proposal.validate()?;

    let id = proposal.id;
    let mut next = project.clone();
    next.proposals.push(proposal);
    Ok(Transition::quiet(next, id))
}
