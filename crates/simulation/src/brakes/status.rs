//! Human-readable brake status strings.

use crate::units::{BrakeComponent, BrakeDisplayUnits};

use super::car::AirBrake;

fn flag(on: bool) -> &'static str {
    if on {
        "+"
    } else {
        "-"
    }
}

impl AirBrake {
    /// Short status: system type and cylinder pressure.
    pub fn status(&self, units: &BrakeDisplayUnits) -> String {
        format!(
            "{} BC {}",
            self.params.kind.label(),
            units.format(BrakeComponent::BrakeCylinder, self.cyl_psi)
        )
    }

    /// Short status plus brake pipe pressure.
    pub fn full_status(&self, units: &BrakeDisplayUnits) -> String {
        format!(
            "{} BP {}",
            self.status(units),
            units.format(BrakeComponent::BrakePipe, self.brake_pipe_psi)
        )
    }

    /// One cell per column of a car-by-car brake table.
    pub fn debug_status(&self, units: &BrakeDisplayUnits) -> Vec<String> {
        let mut cells = vec![
            self.params.kind.label().to_string(),
            units.format(BrakeComponent::BrakeCylinder, self.cyl_psi),
            units.format(BrakeComponent::BrakePipe, self.brake_pipe_psi),
            units.format(BrakeComponent::AuxiliaryReservoir, self.aux_res_psi),
            units.format(BrakeComponent::EmergencyReservoir, self.emergency_res_psi),
        ];
        if self.caps.two_pipes {
            cells.push(units.format(BrakeComponent::MainReservoirPipe, self.second_pipe_psi));
        }
        cells.push(self.triple_valve.label().to_string());
        if self.caps.holding_valve {
            cells.push(format!("HV {}", self.holding_valve.label()));
        }
        cells.push(self.retainer.label().to_string());
        if self.caps.handbrake {
            cells.push(format!("HB {:.0}%", self.handbrake_percent));
        }
        cells.push(format!(
            "{}{}{}",
            flag(self.angle_cock_a_open),
            flag(self.front_hose_connected),
            flag(self.angle_cock_b_open)
        ));
        if self.bleed_off_valve_open {
            cells.push("Bleed".to_string());
        }
        if self.bail_off_on {
            cells.push("BailOff".to_string());
        }
        cells
    }
}
