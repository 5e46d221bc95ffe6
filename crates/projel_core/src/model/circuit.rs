//! Definitive circuits.
//!
//! # Responsibility
//! - Define the circuit record and its installation parameters.
//! - Normalize circuit identifiers for uniqueness comparison.
//!
//! # Invariants
//! - `load_ids` is never empty in a committed project; an emptied circuit is
//!   garbage-collected by the engine in the same command.
//! - `identifier` is stored normalized (trimmed, uppercase) and is unique
//!   within its project.
//! - `snapshot` is an independent copy of the source proposal, frozen at
//!   formalization time.

use super::load::LoadId;
use super::proposal::{Proposal, ProposalId};
use super::validation::{ensure_positive, ValidationError};
use super::zone::ZoneId;
use super::{is_blank, now_epoch_ms, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CircuitId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitKind {
    #[serde(rename = "ILUMINACAO")]
    Lighting,
    #[serde(rename = "TUG")]
    GeneralOutlet,
    #[serde(rename = "TUE")]
    DedicatedOutlet,
    #[serde(rename = "DISTRIBUICAO")]
    Distribution,
    #[serde(rename = "MOTOR")]
    Motor,
}

impl CircuitKind {
    pub const ALL: [Self; 5] = [
        Self::Lighting,
        Self::GeneralOutlet,
        Self::DedicatedOutlet,
        Self::Distribution,
        Self::Motor,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Lighting => "ILUMINACAO",
            Self::GeneralOutlet => "TUG",
            Self::DedicatedOutlet => "TUE",
            Self::Distribution => "DISTRIBUICAO",
            Self::Motor => "MOTOR",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Lighting => "Circuito de iluminação",
            Self::GeneralOutlet => "Tomadas de uso geral",
            Self::DedicatedOutlet => "Tomadas de uso específico",
            Self::Distribution => "Circuito de distribuição",
            Self::Motor => "Circuito de motor",
        }
    }
}

/// Reference installation methods (cable routing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstallationMethod {
    A1,
    A2,
    #[default]
    B1,
    B2,
    C,
    D,
    E,
    F,
    G,
}

impl InstallationMethod {
    pub const ALL: [Self; 9] = [
        Self::A1,
        Self::A2,
        Self::B1,
        Self::B2,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::A1 => "Condutores isolados em eletroduto em parede termicamente isolante",
            Self::A2 => "Cabo multipolar em eletroduto em parede termicamente isolante",
            Self::B1 => "Condutores isolados em eletroduto aparente ou embutido em alvenaria",
            Self::B2 => "Cabo multipolar em eletroduto aparente ou embutido em alvenaria",
            Self::C => "Cabos unipolares ou multipolares sobre parede",
            Self::D => "Cabo multipolar em eletroduto enterrado",
            Self::E => "Cabo multipolar ao ar livre",
            Self::F => "Cabos unipolares justapostos ao ar livre",
            Self::G => "Cabos unipolares espaçados ao ar livre",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConductorMaterial {
    #[default]
    #[serde(rename = "COBRE")]
    Copper,
    #[serde(rename = "ALUMINIO")]
    Aluminium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Insulation {
    #[default]
    #[serde(rename = "PVC")]
    Pvc,
    #[serde(rename = "EPR")]
    Epr,
    #[serde(rename = "XLPE")]
    Xlpe,
}

/// Sizing state reported by the external calculation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CircuitStatus {
    #[default]
    #[serde(rename = "rascunho")]
    Draft,
    #[serde(rename = "calculado")]
    Calculated,
    #[serde(rename = "erro")]
    Failed,
}

/// Installation parameters consumed by the external sizing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationParams {
    #[serde(rename = "metodo_instalacao")]
    pub method: InstallationMethod,
    /// When set, the circuit's own parameters take precedence over the
    /// zone's influence codes.
    #[serde(rename = "sobrescreve_influencias", default)]
    pub overrides_influences: bool,
    #[serde(rename = "tensao_nominal")]
    pub nominal_voltage: f64,
    #[serde(rename = "circuitos_agrupados")]
    pub grouped_circuits: u32,
    #[serde(rename = "fator_agrupamento", default)]
    pub grouping_factor: Option<f64>,
    /// Degrees Celsius.
    #[serde(rename = "temperatura_ambiente", default)]
    pub ambient_temperature: Option<f64>,
    #[serde(rename = "comprimento_m", default)]
    pub length_m: Option<f64>,
    #[serde(rename = "material_condutor", default)]
    pub material: ConductorMaterial,
    #[serde(rename = "isolacao", default)]
    pub insulation: Insulation,
}

impl Default for InstallationParams {
    fn default() -> Self {
        Self {
            method: InstallationMethod::B1,
            overrides_influences: false,
            nominal_voltage: 127.0,
            grouped_circuits: 1,
            grouping_factor: None,
            ambient_temperature: None,
            length_m: None,
            material: ConductorMaterial::Copper,
            insulation: Insulation::Pvc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub id: CircuitId,
    #[serde(rename = "identificador")]
    pub identifier: String,
    #[serde(rename = "tipo_circuito")]
    pub kind: CircuitKind,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "zona_id")]
    pub zone_id: ZoneId,
    #[serde(rename = "cargas_ids")]
    pub load_ids: Vec<LoadId>,
    #[serde(flatten)]
    pub params: InstallationParams,
    #[serde(rename = "proposta_id", default)]
    pub proposal_id: Option<ProposalId>,
    #[serde(rename = "proposta_snapshot", default)]
    pub snapshot: Option<Proposal>,
    #[serde(rename = "data_criacao", default)]
    pub created_at: i64,
    #[serde(default)]
    pub status: CircuitStatus,
}

/// Caller-supplied circuit attributes, used both for direct creation and for
/// formalizing a proposal (where `load_ids` is ignored).
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitDraft {
    pub identifier: String,
    pub kind: CircuitKind,
    pub description: String,
    pub zone_id: ZoneId,
    pub load_ids: Vec<LoadId>,
    pub params: InstallationParams,
}

impl CircuitDraft {
    pub fn new(identifier: impl Into<String>, kind: CircuitKind, zone_id: ZoneId) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            description: String::new(),
            zone_id,
            load_ids: Vec::new(),
            params: InstallationParams::default(),
        }
    }

    pub fn with_loads(mut self, load_ids: Vec<LoadId>) -> Self {
        self.load_ids = load_ids;
        self
    }

    /// Materializes a circuit with a fresh id. The identifier is normalized.
    pub fn into_circuit(self) -> Circuit {
        Circuit {
            id: Uuid::new_v4(),
            identifier: normalize_identifier(&self.identifier),
            kind: self.kind,
            description: self.description,
            zone_id: self.zone_id,
            load_ids: self.load_ids,
            params: self.params,
            proposal_id: None,
            snapshot: None,
            created_at: now_epoch_ms(),
            status: CircuitStatus::Draft,
        }
    }
}

/// Canonical identifier form used for storage and uniqueness checks.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

impl Circuit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId(EntityKind::Circuit));
        }
        if is_blank(&self.identifier) {
            return Err(ValidationError::BlankIdentifier);
        }
        if self.zone_id.is_nil() {
            return Err(ValidationError::MissingZoneReference(EntityKind::Circuit));
        }
        if self.load_ids.is_empty() {
            return Err(ValidationError::EmptyLoadSet(EntityKind::Circuit));
        }
        ensure_positive(
            EntityKind::Circuit,
            "tensao_nominal",
            self.params.nominal_voltage,
        )?;
        ensure_positive(
            EntityKind::Circuit,
            "circuitos_agrupados",
            f64::from(self.params.grouped_circuits),
        )?;
        Ok(())
    }

    pub fn contains_load(&self, load_id: LoadId) -> bool {
        self.load_ids.contains(&load_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_identifier, CircuitDraft, CircuitKind, InstallationMethod};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn normalize_identifier_trims_and_uppercases() {
        assert_eq!(normalize_identifier("  c1 "), "C1");
        assert_eq!(normalize_identifier("tug-cozinha"), "TUG-COZINHA");
        assert_eq!(normalize_identifier("   "), "");
    }

    #[test]
    fn draft_defaults_match_common_residential_circuit() {
        let circuit = CircuitDraft::new(" c7", CircuitKind::GeneralOutlet, Uuid::new_v4())
            .with_loads(vec![Uuid::new_v4()])
            .into_circuit();

        assert_eq!(circuit.identifier, "C7");
        assert_eq!(circuit.params.method, InstallationMethod::B1);
        assert!((circuit.params.nominal_voltage - 127.0).abs() < f64::EPSILON);
        assert_eq!(circuit.params.grouped_circuits, 1);
        circuit.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_grouped_circuits() {
        let mut circuit = CircuitDraft::new("C1", CircuitKind::Lighting, Uuid::new_v4())
            .with_loads(vec![Uuid::new_v4()])
            .into_circuit();
        circuit.params.grouped_circuits = 0;

        assert!(matches!(
            circuit.validate().unwrap_err(),
            ValidationError::NonPositive {
                field: "circuitos_agrupados",
                ..
            }
        ));
    }

    #[test]
    fn params_flatten_into_persisted_layout() {
        let circuit = CircuitDraft::new("C1", CircuitKind::Lighting, Uuid::new_v4())
            .with_loads(vec![Uuid::new_v4()])
            .into_circuit();

        let json = serde_json::to_value(&circuit).unwrap();
        assert_eq!(json["identificador"], "C1");
        assert_eq!(json["tipo_circuito"], "ILUMINACAO");
        assert_eq!(json["metodo_instalacao"], "B1");
        assert_eq!(json["material_condutor"], "COBRE");
        assert!(json["proposta_snapshot"].is_null());
    }
}
