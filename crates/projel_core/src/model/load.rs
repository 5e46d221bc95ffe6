//! Electrical loads (consumers).
//!
//! # Invariants
//! - `location_id` always names the owning location.
//! - `zone_id` is inherited from the location when absent and is never
//!   resynchronized afterwards (see `engine::commands::refresh_inherited_zones`).
//! - `circuit_id` mirrors membership in exactly one circuit's load set, or is
//!   `None` for unassigned loads.

use super::circuit::CircuitId;
use super::location::LocationId;
use super::validation::{ensure_positive, ValidationError};
use super::zone::ZoneId;
use super::{is_blank, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LoadId = Uuid;

/// Load category used by the soft circuit-type heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadKind {
    #[serde(rename = "ILUMINACAO", alias = "Iluminacao", alias = "iluminacao")]
    Lighting,
    /// General-purpose outlet.
    #[serde(rename = "TUG", alias = "tug")]
    GeneralOutlet,
    /// Dedicated (specific-use) outlet.
    #[serde(rename = "TUE", alias = "tue")]
    DedicatedOutlet,
    #[serde(rename = "MOTOR", alias = "motor")]
    Motor,
}

impl LoadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lighting => "ILUMINACAO",
            Self::GeneralOutlet => "TUG",
            Self::DedicatedOutlet => "TUE",
            Self::Motor => "MOTOR",
        }
    }

    /// Dedicated equipment and motors normally demand an exclusive circuit.
    pub fn needs_exclusive_circuit(self) -> bool {
        matches!(self, Self::DedicatedOutlet | Self::Motor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUnit {
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "VA")]
    VoltAmpere,
}

/// Who produced the load entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadOrigin {
    /// Derived from the minimum-provision rules.
    #[serde(rename = "norma")]
    RuleDerived,
    #[default]
    #[serde(rename = "usuario")]
    UserEntered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadStatus {
    #[default]
    #[serde(rename = "ativo")]
    Active,
    #[serde(rename = "inativo")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    #[serde(rename = "local_id")]
    pub location_id: LocationId,
    /// Inherited from the location at creation/update time when absent.
    #[serde(rename = "zona_id", default)]
    pub zone_id: Option<ZoneId>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: LoadKind,
    /// Total rated power of this entry, in `unit`.
    #[serde(rename = "potencia")]
    pub power: f64,
    #[serde(rename = "unidade")]
    pub unit: PowerUnit,
    #[serde(rename = "fator_potencia", default = "default_power_factor")]
    pub power_factor: f64,
    /// Number of points represented by this entry (outlets, fixtures).
    #[serde(rename = "quantidade", default = "default_quantity")]
    pub quantity: u32,
    #[serde(rename = "origem", default)]
    pub origin: LoadOrigin,
    #[serde(default)]
    pub status: LoadStatus,
    #[serde(rename = "circuito_id", default)]
    pub circuit_id: Option<CircuitId>,
}

fn default_power_factor() -> f64 {
    1.0
}

fn default_quantity() -> u32 {
    1
}

impl Load {
    /// Creates a user-entered, unassigned load with unit power factor.
    pub fn new(
        location_id: LocationId,
        name: impl Into<String>,
        kind: LoadKind,
        power: f64,
        unit: PowerUnit,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            location_id,
            zone_id: None,
            name: name.into(),
            kind,
            power,
            unit,
            power_factor: default_power_factor(),
            quantity: default_quantity(),
            origin: LoadOrigin::UserEntered,
            status: LoadStatus::Active,
            circuit_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId(EntityKind::Load));
        }
        if is_blank(&self.name) {
            return Err(ValidationError::BlankName(EntityKind::Load));
        }
        if self.location_id.is_nil() {
            return Err(ValidationError::MissingLocationReference);
        }
        ensure_positive(EntityKind::Load, "potencia", self.power)?;
        if !(self.power_factor > 0.0 && self.power_factor <= 1.0) {
            return Err(ValidationError::PowerFactorOutOfRange(self.power_factor));
        }
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        Ok(())
    }

    /// Apparent power in VA.
    pub fn apparent_power_va(&self) -> f64 {
        match self.unit {
            PowerUnit::VoltAmpere => self.power,
            PowerUnit::Watt => self.power / self.power_factor,
        }
    }

    /// Active power in W.
    pub fn active_power_w(&self) -> f64 {
        match self.unit {
            PowerUnit::VoltAmpere => self.power * self.power_factor,
            PowerUnit::Watt => self.power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Load, LoadKind, PowerUnit};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn power_conversions_follow_power_factor() {
        let mut load = Load::new(
            Uuid::new_v4(),
            "Motor",
            LoadKind::Motor,
            800.0,
            PowerUnit::Watt,
        );
        load.power_factor = 0.8;
        assert!((load.apparent_power_va() - 1000.0).abs() < 1e-9);
        assert!((load.active_power_w() - 800.0).abs() < 1e-9);

        load.unit = PowerUnit::VoltAmpere;
        assert!((load.active_power_w() - 640.0).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_out_of_range_power_factor() {
        let mut load = Load::new(
            Uuid::new_v4(),
            "TUG",
            LoadKind::GeneralOutlet,
            100.0,
            PowerUnit::VoltAmpere,
        );
        load.power_factor = 1.2;
        assert_eq!(
            load.validate().unwrap_err(),
            ValidationError::PowerFactorOutOfRange(1.2)
        );
    }

    #[test]
    fn kind_accepts_legacy_mixed_case_lighting_tag() {
        let kind: LoadKind = serde_json::from_str("\"Iluminacao\"").unwrap();
        assert_eq!(kind, LoadKind::Lighting);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"ILUMINACAO\"");
    }
}
