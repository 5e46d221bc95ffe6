//! Minimum-provision suggestion calculators.
//!
//! Pure functions from a location's geometry and profile to the minimum
//! lighting and general-outlet loads it should carry.

use crate::model::load::{Load, LoadKind, LoadOrigin, PowerUnit};
use crate::model::location::{Location, LocationProfile};

const BASE_LIGHTING_VA: f64 = 100.0;
const BASE_LIGHTING_AREA_M2: f64 = 6.0;
const LIGHTING_STEP_AREA_M2: f64 = 4.0;
const LIGHTING_STEP_VA: f64 = 60.0;

const DRY_OUTLET_SPACING_M: f64 = 5.0;
const WET_OUTLET_SPACING_M: f64 = 3.5;
const HEAVY_OUTLET_VA: f64 = 600.0;
const LIGHT_OUTLET_VA: f64 = 100.0;
const HEAVY_OUTLETS_IN_WET_AREA: u32 = 3;

pub const SUGGESTED_LIGHTING_NAME: &str = "Iluminação Central";
pub const SUGGESTED_OUTLETS_NAME: &str = "Tomadas de Uso Geral";

/// 100 VA for the first 6 m², plus 60 VA per whole 4 m² beyond that.
pub fn minimum_lighting_va(area_m2: f64) -> f64 {
    if area_m2 <= BASE_LIGHTING_AREA_M2 {
        return BASE_LIGHTING_VA;
    }
    let steps = ((area_m2 - BASE_LIGHTING_AREA_M2) / LIGHTING_STEP_AREA_M2).floor();
    BASE_LIGHTING_VA + steps * LIGHTING_STEP_VA
}

/// Minimum number of general-purpose outlets for a perimeter.
pub fn minimum_outlet_count(perimeter_m: f64, profile: LocationProfile) -> u32 {
    match profile {
        LocationProfile::Bathroom => 1,
        LocationProfile::Kitchen | LocationProfile::Service => {
            per_spacing(perimeter_m, WET_OUTLET_SPACING_M).max(2)
        }
        LocationProfile::Standard | LocationProfile::Outdoor => {
            per_spacing(perimeter_m, DRY_OUTLET_SPACING_M).max(1)
        }
    }
}

/// Total apparent power assigned to `count` general-purpose outlets.
pub fn outlet_power_va(count: u32, profile: LocationProfile) -> f64 {
    match profile {
        LocationProfile::Bathroom => f64::from(count) * HEAVY_OUTLET_VA,
        profile if profile.is_wet_area() => {
            let heavy = count.min(HEAVY_OUTLETS_IN_WET_AREA);
            f64::from(heavy) * HEAVY_OUTLET_VA + f64::from(count - heavy) * LIGHT_OUTLET_VA
        }
        _ => f64::from(count) * LIGHT_OUTLET_VA,
    }
}

/// One point per `spacing` metres or fraction thereof.
fn per_spacing(perimeter_m: f64, spacing: f64) -> u32 {
    if perimeter_m <= 0.0 {
        return 0;
    }
    (perimeter_m / spacing).ceil() as u32
}

/// Rule-derived load proposed for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSuggestion {
    pub name: &'static str,
    pub kind: LoadKind,
    pub power_va: f64,
    pub quantity: u32,
}

impl LoadSuggestion {
    /// Materializes the suggestion as a rule-derived load of `location`,
    /// with the location's zone already inherited.
    pub fn into_load(self, location: &Location) -> Load {
        let mut load = Load::new(
            location.id,
            self.name,
            self.kind,
            self.power_va,
            PowerUnit::VoltAmpere,
        );
        load.quantity = self.quantity;
        load.origin = LoadOrigin::RuleDerived;
        load.zone_id = Some(location.zone_id);
        load
    }
}

/// Exactly one lighting load and one general-outlet load for `location`.
pub fn suggest_loads(location: &Location) -> Vec<LoadSuggestion> {
    let outlets = minimum_outlet_count(location.perimeter_m, location.profile);
    vec![
        LoadSuggestion {
            name: SUGGESTED_LIGHTING_NAME,
            kind: LoadKind::Lighting,
            power_va: minimum_lighting_va(location.area_m2),
            quantity: 1,
        },
        LoadSuggestion {
            name: SUGGESTED_OUTLETS_NAME,
            kind: LoadKind::GeneralOutlet,
            power_va: outlet_power_va(outlets, location.profile),
            quantity: outlets,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{minimum_lighting_va, minimum_outlet_count, outlet_power_va, suggest_loads};
    use crate::model::load::{LoadKind, LoadOrigin};
    use crate::model::location::{Location, LocationProfile};
    use uuid::Uuid;

    #[test]
    fn lighting_steps_every_whole_four_square_metres() {
        assert_eq!(minimum_lighting_va(4.0), 100.0);
        assert_eq!(minimum_lighting_va(6.0), 100.0);
        assert_eq!(minimum_lighting_va(9.99), 100.0);
        assert_eq!(minimum_lighting_va(10.0), 160.0);
        assert_eq!(minimum_lighting_va(18.5), 280.0);
    }

    #[test]
    fn outlet_count_depends_on_profile() {
        assert_eq!(minimum_outlet_count(13.0, LocationProfile::Standard), 3);
        assert_eq!(minimum_outlet_count(2.0, LocationProfile::Outdoor), 1);
        assert_eq!(minimum_outlet_count(3.0, LocationProfile::Kitchen), 2);
        assert_eq!(minimum_outlet_count(14.0, LocationProfile::Service), 4);
        assert_eq!(minimum_outlet_count(20.0, LocationProfile::Bathroom), 1);
    }

    #[test]
    fn wet_areas_get_three_heavy_outlets() {
        assert_eq!(outlet_power_va(5, LocationProfile::Kitchen), 2000.0);
        assert_eq!(outlet_power_va(2, LocationProfile::Service), 1200.0);
        assert_eq!(outlet_power_va(1, LocationProfile::Bathroom), 600.0);
        assert_eq!(outlet_power_va(3, LocationProfile::Standard), 300.0);
    }

    #[test]
    fn suggest_loads_yields_one_lighting_and_one_outlet_entry() {
        let location = Location::new(Uuid::new_v4(), "Sala", 10.0, 13.0);
        let suggestions = suggest_loads(&location);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].kind, LoadKind::Lighting);
        assert_eq!(suggestions[0].power_va, 160.0);
        assert_eq!(suggestions[1].kind, LoadKind::GeneralOutlet);
        assert_eq!(suggestions[1].quantity, 3);

        let load = suggestions[1].clone().into_load(&location);
        assert_eq!(load.origin, LoadOrigin::RuleDerived);
        assert_eq!(load.zone_id, Some(location.zone_id));
        load.validate().unwrap();
    }
}
