//! Zones of external influence.
//!
//! A zone classifies locations that share physical and usage conditions.
//! Beyond identity and a display name, its attributes are opaque to the
//! consistency engine.

use super::validation::ValidationError;
use super::{is_blank, now_epoch_ms, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ZoneId = Uuid;

/// How the zone was authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoneOrigin {
    /// Taken verbatim from a preset.
    #[serde(rename = "preset")]
    Preset,
    /// Started from a preset, then edited.
    #[serde(rename = "ajustada")]
    Adjusted,
    #[default]
    #[serde(rename = "custom")]
    Custom,
}

/// External-influence class codes, one per influence category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceCodes {
    /// AA: ambient temperature.
    #[serde(rename = "temp_ambiente")]
    pub ambient_temperature: String,
    /// AD: presence of water.
    #[serde(rename = "presenca_agua")]
    pub water: String,
    /// AE: presence of solid bodies.
    #[serde(rename = "presenca_solidos")]
    pub solids: String,
    /// BA: competence of persons.
    #[serde(rename = "competencia_pessoas")]
    pub occupants: String,
    /// CA: construction materials.
    #[serde(rename = "materiais_construcao")]
    pub materials: String,
    /// CB: building structure.
    #[serde(rename = "estrutura_edificacao")]
    pub structure: String,
}

impl Default for InfluenceCodes {
    fn default() -> Self {
        Self {
            ambient_temperature: "AA4".to_string(),
            water: "AD1".to_string(),
            solids: "AE1".to_string(),
            occupants: "BA1".to_string(),
            materials: "CA1".to_string(),
            structure: "CB1".to_string(),
        }
    }
}

impl InfluenceCodes {
    /// Codes in canonical category order (AA, AD, AE, BA, CA, CB).
    pub fn codes(&self) -> [&str; 6] {
        [
            self.ambient_temperature.as_str(),
            self.water.as_str(),
            self.solids.as_str(),
            self.occupants.as_str(),
            self.materials.as_str(),
            self.structure.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "origem", default)]
    pub origin: ZoneOrigin,
    #[serde(default)]
    pub preset_id: Option<String>,
    #[serde(flatten)]
    pub influences: InfluenceCodes,
    #[serde(rename = "cor_identificacao", default)]
    pub color: String,
    #[serde(rename = "data_criacao", default)]
    pub created_at: i64,
}

impl Zone {
    /// Creates a custom zone with default (benign) influence codes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            origin: ZoneOrigin::Custom,
            preset_id: None,
            influences: InfluenceCodes::default(),
            color: String::new(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId(EntityKind::Zone));
        }
        if is_blank(&self.name) {
            return Err(ValidationError::BlankName(EntityKind::Zone));
        }
        Ok(())
    }
}
