use crate::units::{BrakeComponent, BrakeDisplayUnits};

use super::types::Train;

impl Train {
    /// Lead status line: equalizing reservoir, main reservoir, engine brake
    /// and the lead car, then the last car's brake pipe and cylinder.
    pub fn brake_status(&self, units: &BrakeDisplayUnits) -> String {
        let mut parts = vec![format!(
            "EQ {}",
            units.format(
                BrakeComponent::EqualizingReservoir,
                self.controller.equalizing_reservoir_psi
            )
        )];

        if let Some(lead) = self.lead_locomotive.and_then(|i| self.cars.get(i)) {
            if let Some(loco) = &lead.locomotive {
                parts.push(format!(
                    "MR {}",
                    units.format(BrakeComponent::MainReservoir, loco.main_res_psi)
                ));
            }
            parts.push(format!(
                "EB {}",
                units.format(BrakeComponent::BrakeCylinder, lead.brake.engine_line_psi)
            ));
            parts.push(lead.brake.full_status(units));
        }

        if self.cars.len() > 1 {
            if let Some(last) = self.cars.last() {
                parts.push(format!("Last {}", last.brake.full_status(units)));
            }
        }
        parts.join("  ")
    }

    /// One row per car for a brake debug table.
    pub fn debug_status(&self, units: &BrakeDisplayUnits) -> Vec<Vec<String>> {
        self.cars
            .iter()
            .enumerate()
            .map(|(index, car)| {
                let mut row = vec![index.to_string(), car.name.clone()];
                row.extend(car.brake.debug_status(units));
                if let Some(loco) = &car.locomotive {
                    row.push(units.format(BrakeComponent::MainReservoir, loco.main_res_psi));
                    if loco.compressor_on {
                        row.push("Comp".to_string());
                    }
                }
                row
            })
            .collect()
    }
}
