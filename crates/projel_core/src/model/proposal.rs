//! Circuit proposals and client-local draft groupings.
//!
//! # Responsibility
//! - Define the proposal record and its status machine.
//! - Define the ephemeral "pre-circuit" draft grouping.
//!
//! # Invariants
//! - A proposal groups at least one load.
//! - `accepted` is reached only through formalization into a circuit.
//! - Accepted and discarded proposals are never edited again.

use super::load::LoadId;
use super::location::LocationId;
use super::validation::ValidationError;
use super::zone::ZoneId;
use super::{now_epoch_ms, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ProposalId = Uuid;
pub type DraftId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProposalStatus {
    #[default]
    #[serde(rename = "rascunho")]
    Draft,
    #[serde(rename = "analisada")]
    Analyzed,
    #[serde(rename = "invalida")]
    Invalid,
    #[serde(rename = "aceita")]
    Accepted,
    #[serde(rename = "descartada")]
    Discarded,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Analyzed => "analyzed",
            Self::Invalid => "invalid",
            Self::Accepted => "accepted",
            Self::Discarded => "discarded",
        }
    }

    /// Allowed status moves.
    ///
    /// `Analyzed -> Analyzed` covers re-running the analysis.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ProposalStatus::{Accepted, Analyzed, Discarded, Draft, Invalid};
        matches!(
            (self, next),
            (Draft, Analyzed | Invalid | Discarded)
                | (Analyzed, Analyzed | Invalid | Accepted | Discarded)
                | (Invalid, Discarded)
        )
    }

    /// Content edits are allowed until the proposal is accepted or discarded.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Analyzed | Self::Invalid)
    }
}

impl Display for ProposalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    /// Unix epoch milliseconds.
    #[serde(rename = "data_criacao")]
    pub created_at: i64,
    pub status: ProposalStatus,
    #[serde(rename = "cargas_ids")]
    pub load_ids: Vec<LoadId>,
    /// Derived from the member loads.
    #[serde(rename = "locais_ids", default)]
    pub location_ids: Vec<LocationId>,
    /// Derived from the member loads' inherited zones.
    #[serde(rename = "zonas_ids", default)]
    pub zone_ids: Vec<ZoneId>,
    #[serde(rename = "descricao_intencao")]
    pub intent: String,
    /// Advisory normative text; never blocks anything.
    #[serde(rename = "observacoes_normativas", default)]
    pub normative_notes: Option<String>,
    #[serde(rename = "autor")]
    pub author: String,
}

impl Proposal {
    /// Creates a draft proposal. Touched locations/zones are filled by the engine.
    pub fn new(
        load_ids: Vec<LoadId>,
        intent: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now_epoch_ms(),
            status: ProposalStatus::Draft,
            load_ids,
            location_ids: Vec::new(),
            zone_ids: Vec::new(),
            intent: intent.into(),
            normative_notes: None,
            author: author.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId(EntityKind::Proposal));
        }
        if self.load_ids.is_empty() {
            return Err(ValidationError::EmptyLoadSet(EntityKind::Proposal));
        }
        Ok(())
    }
}

/// Client-local grouping used to sketch circuits before proposing them.
///
/// Unlike circuits, a draft may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftGroup {
    pub id: DraftId,
    pub name: String,
    pub load_ids: Vec<LoadId>,
    /// Why the assistant suggested this grouping, if it did.
    pub rationale: Option<String>,
}

impl DraftGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            load_ids: Vec::new(),
            rationale: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Proposal, ProposalStatus};
    use crate::model::{EntityKind, ValidationError};

    #[test]
    fn status_machine_only_accepts_from_analyzed() {
        assert!(ProposalStatus::Analyzed.can_transition_to(ProposalStatus::Accepted));
        assert!(!ProposalStatus::Draft.can_transition_to(ProposalStatus::Accepted));
        assert!(!ProposalStatus::Invalid.can_transition_to(ProposalStatus::Accepted));
        assert!(!ProposalStatus::Accepted.can_transition_to(ProposalStatus::Discarded));
        assert!(!ProposalStatus::Discarded.can_transition_to(ProposalStatus::Analyzed));
    }

    #[test]
    fn accepted_and_discarded_are_frozen() {
        assert!(ProposalStatus::Invalid.is_editable());
        assert!(!ProposalStatus::Accepted.is_editable());
        assert!(!ProposalStatus::Discarded.is_editable());
    }

    #[test]
    fn validate_rejects_empty_load_set() {
        let proposal = Proposal::new(Vec::new(), "Iluminacao geral", "Projetista");
        assert_eq!(
            proposal.validate().unwrap_err(),
            ValidationError::EmptyLoadSet(EntityKind::Proposal)
        );
    }

    #[test]
    fn status_uses_persisted_wire_values() {
        let json = serde_json::to_string(&ProposalStatus::Analyzed).unwrap();
        assert_eq!(json, "\"analisada\"");
    }
}
