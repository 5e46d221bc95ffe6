//! Physical locations (rooms and spaces).

use super::validation::{ensure_positive, ValidationError};
use super::zone::ZoneId;
use super::{is_blank, now_epoch_ms, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LocationId = Uuid;

const DEFAULT_CEILING_HEIGHT_M: f64 = 2.8;

/// Usage profile driving the minimum-provision rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocationProfile {
    #[default]
    #[serde(rename = "padrao")]
    Standard,
    #[serde(rename = "cozinha")]
    Kitchen,
    #[serde(rename = "banheiro")]
    Bathroom,
    #[serde(rename = "servico")]
    Service,
    #[serde(rename = "externo")]
    Outdoor,
}

impl LocationProfile {
    /// Kitchens and service areas follow the denser outlet rule.
    pub fn is_wet_area(self) -> bool {
        matches!(self, Self::Kitchen | Self::Service)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "padrao",
            Self::Kitchen => "cozinha",
            Self::Bathroom => "banheiro",
            Self::Service => "servico",
            Self::Outdoor => "externo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    #[serde(rename = "zona_id")]
    pub zone_id: ZoneId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo", default)]
    pub profile: LocationProfile,
    pub area_m2: f64,
    #[serde(rename = "perimetro_m")]
    pub perimeter_m: f64,
    #[serde(rename = "pe_direito_m", default = "default_ceiling_height")]
    pub ceiling_height_m: f64,
    #[serde(rename = "data_criacao", default)]
    pub created_at: i64,
}

fn default_ceiling_height() -> f64 {
    DEFAULT_CEILING_HEIGHT_M
}

impl Location {
    pub fn new(
        zone_id: ZoneId,
        name: impl Into<String>,
        area_m2: f64,
        perimeter_m: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            zone_id,
            name: name.into(),
            profile: LocationProfile::Standard,
            area_m2,
            perimeter_m,
            ceiling_height_m: DEFAULT_CEILING_HEIGHT_M,
            created_at: now_epoch_ms(),
        }
    }

    pub fn with_profile(mut self, profile: LocationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Checks identity, zone presence and positive geometry.
    ///
    /// Whether the zone actually exists is an integrity concern and is
    /// checked by the engine.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId(EntityKind::Location));
        }
        if is_blank(&self.name) {
            return Err(ValidationError::BlankName(EntityKind::Location));
        }
        if self.zone_id.is_nil() {
            return Err(ValidationError::MissingZoneReference(EntityKind::Location));
        }
        ensure_positive(EntityKind::Location, "area_m2", self.area_m2)?;
        ensure_positive(EntityKind::Location, "perimetro_m", self.perimeter_m)?;
        ensure_positive(EntityKind::Location, "pe_direito_m", self.ceiling_height_m)?;
        Ok(())
    }
}
