//! How the runner prints pressures. Persisted with the session so a reloaded
//! run keeps the operator's units.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use save::SaveableAppExt;
use simulation::train::Train;
use simulation::units::{BrakeDisplayUnits, PressureUnit};
use simulation::Saveable;

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
pub struct DisplayPreferences {
    pub units: BrakeDisplayUnits,
    /// Print the per-car table after every status line.
    pub car_table: bool,
}

impl DisplayPreferences {
    pub fn metric(car_table: bool) -> Self {
        Self {
            units: BrakeDisplayUnits::metric(),
            car_table,
        }
    }

    pub fn status_lines(&self, tick: u64, train: &Train) -> Vec<String> {
        let mut lines = vec![format!(
            "[{tick:>6}] {} ({} cars)  {}",
            train.name,
            train.cars.len(),
            train.brake_status(&self.units)
        )];
        if self.car_table {
            lines.extend(
                train
                    .debug_status(&self.units)
                    .into_iter()
                    .map(|row| format!("         {}", row.join("  "))),
            );
        }
        lines
    }
}

impl Saveable for DisplayPreferences {
    const SAVE_KEY: &'static str = "display_preferences";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if *self == Self::default() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        simulation::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

pub struct DisplayPlugin {
    pub initial: DisplayPreferences,
}

impl Plugin for DisplayPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.initial)
            .register_saveable::<DisplayPreferences>();
    }
}

/// Parse a unit name as typed on the command line.
pub fn parse_unit(name: &str) -> Option<PressureUnit> {
    match name.to_ascii_lowercase().as_str() {
        "psi" => Some(PressureUnit::Psi),
        "inhg" => Some(PressureUnit::InHg),
        "bar" => Some(PressureUnit::Bar),
        "kpa" => Some(PressureUnit::KPa),
        "kgf" | "kgf/cm2" => Some(PressureUnit::KgfPerCm2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::test_harness::freight_consist;

    #[test]
    fn test_status_lines_include_car_table_on_request() {
        let train = freight_consist("freight", 2);
        let brief = DisplayPreferences::default().status_lines(30, &train);
        assert_eq!(brief.len(), 1);
        assert!(brief[0].contains("freight (3 cars)"), "{}", brief[0]);

        let table = DisplayPreferences {
            car_table: true,
            ..Default::default()
        }
        .status_lines(30, &train);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_default_preferences_are_not_saved() {
        assert!(DisplayPreferences::default().save_to_bytes().is_none());
        let metric = DisplayPreferences::metric(false);
        let bytes = metric.save_to_bytes().unwrap();
        assert_eq!(DisplayPreferences::load_from_bytes(&bytes), metric);
    }

    #[test]
    fn test_parse_unit_is_case_insensitive() {
        assert_eq!(parse_unit("KPa"), Some(PressureUnit::KPa));
        assert_eq!(parse_unit("BAR"), Some(PressureUnit::Bar));
        assert_eq!(parse_unit("atm"), None);
    }
}
