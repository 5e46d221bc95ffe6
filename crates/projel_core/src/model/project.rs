//! Project aggregate root.
//!
//! # Responsibility
//! - Own the ordered entity collections of one installation project.
//! - Merge partial updates of project-level attributes.
//!
//! # Invariants
//! - `id` is stable for the project lifetime.
//! - Draft groupings are client-local and never serialized.

use super::circuit::{Circuit, CircuitId};
use super::load::{Load, LoadId};
use super::location::{Location, LocationId};
use super::proposal::{DraftGroup, DraftId, Proposal, ProposalId};
use super::validation::ValidationError;
use super::zone::{Zone, ZoneId};
use super::{is_blank, now_epoch_ms, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;

/// Phase arrangement of the supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhaseSystem {
    #[serde(rename = "monofasico")]
    SinglePhase,
    #[serde(rename = "bifasico")]
    TwoPhase,
    #[default]
    #[serde(rename = "trifasico")]
    ThreePhase,
}

/// Earthing arrangement (opaque to the consistency engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundingScheme {
    #[serde(rename = "TT")]
    Tt,
    #[serde(rename = "TN-S")]
    TnS,
    #[serde(rename = "TN-C")]
    TnC,
    #[serde(rename = "TN-C-S")]
    TnCS,
    #[serde(rename = "IT")]
    It,
}

/// Electrical-system parameters carried by a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricalSystem {
    /// Nominal voltage label, e.g. `127/220V`.
    #[serde(rename = "tensao_sistema")]
    pub voltage: String,
    #[serde(rename = "sistema")]
    pub phases: PhaseSystem,
    #[serde(rename = "esquema_aterramento", default)]
    pub grounding: Option<GroundingScheme>,
    #[serde(rename = "descricao_aterramento", default)]
    pub grounding_notes: Option<String>,
}

impl Default for ElectricalSystem {
    fn default() -> Self {
        Self {
            voltage: "127/220V".to_string(),
            phases: PhaseSystem::default(),
            grounding: None,
            grounding_notes: None,
        }
    }
}

/// Root aggregate: one project and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(rename = "nome")]
    pub name: String,
    /// Free-form category such as `Residencial` or `Comercial`.
    #[serde(rename = "tipo_instalacao", default)]
    pub installation_type: String,
    #[serde(flatten)]
    pub system: ElectricalSystem,
    /// Unix epoch milliseconds.
    #[serde(rename = "data_criacao")]
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on every committed command.
    #[serde(rename = "ultima_modificacao")]
    pub updated_at: i64,
    #[serde(rename = "zonas", default)]
    pub zones: Vec<Zone>,
    #[serde(rename = "locais", default)]
    pub locations: Vec<Location>,
    #[serde(rename = "cargas", default)]
    pub loads: Vec<Load>,
    #[serde(rename = "propostas", default)]
    pub proposals: Vec<Proposal>,
    #[serde(rename = "circuitos", default)]
    pub circuits: Vec<Circuit>,
    /// Ephemeral pre-circuit groupings; dropped on persistence.
    #[serde(skip)]
    pub drafts: Vec<DraftGroup>,
}

/// Partial update for project-level attributes. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub installation_type: Option<String>,
    pub voltage: Option<String>,
    pub phases: Option<PhaseSystem>,
    pub grounding: Option<GroundingScheme>,
    pub grounding_notes: Option<String>,
}

impl Project {
    /// Creates an empty project with a generated id.
    pub fn new(name: impl Into<String>, system: ElectricalSystem) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            installation_type: String::new(),
            system,
            created_at: now,
            updated_at: now,
            zones: Vec::new(),
            locations: Vec::new(),
            loads: Vec::new(),
            proposals: Vec::new(),
            circuits: Vec::new(),
            drafts: Vec::new(),
        }
    }

    /// Validates project-level attributes only (not the owned entities).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId(EntityKind::Project));
        }
        if is_blank(&self.name) {
            return Err(ValidationError::BlankName(EntityKind::Project));
        }
        Ok(())
    }

    /// Returns a copy with `patch` merged in. The receiver is left untouched.
    pub fn merged(&self, patch: &ProjectPatch) -> Self {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.trim().to_string();
        }
        if let Some(installation_type) = &patch.installation_type {
            next.installation_type = installation_type.clone();
        }
        if let Some(voltage) = &patch.voltage {
            next.system.voltage = voltage.clone();
        }
        if let Some(phases) = patch.phases {
            next.system.phases = phases;
        }
        if let Some(grounding) = patch.grounding {
            next.system.grounding = Some(grounding);
        }
        if let Some(notes) = &patch.grounding_notes {
            next.system.grounding_notes = Some(notes.clone());
        }
        next
    }

    pub fn touch(&mut self) {
        self.updated_at = now_epoch_ms().max(self.updated_at);
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }

    pub fn load(&self, id: LoadId) -> Option<&Load> {
        self.loads.iter().find(|load| load.id == id)
    }

    pub fn load_mut(&mut self, id: LoadId) -> Option<&mut Load> {
        self.loads.iter_mut().find(|load| load.id == id)
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|proposal| proposal.id == id)
    }

    pub fn proposal_mut(&mut self, id: ProposalId) -> Option<&mut Proposal> {
        self.proposals.iter_mut().find(|proposal| proposal.id == id)
    }

    pub fn circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.iter().find(|circuit| circuit.id == id)
    }

    pub fn circuit_mut(&mut self, id: CircuitId) -> Option<&mut Circuit> {
        self.circuits.iter_mut().find(|circuit| circuit.id == id)
    }

    pub fn draft(&self, id: DraftId) -> Option<&DraftGroup> {
        self.drafts.iter().find(|draft| draft.id == id)
    }

    pub fn draft_mut(&mut self, id: DraftId) -> Option<&mut DraftGroup> {
        self.drafts.iter_mut().find(|draft| draft.id == id)
    }

    /// Loads attached to one location, in collection order.
    pub fn loads_in_location(&self, location_id: LocationId) -> impl Iterator<Item = &Load> {
        self.loads
            .iter()
            .filter(move |load| load.location_id == location_id)
    }
}
