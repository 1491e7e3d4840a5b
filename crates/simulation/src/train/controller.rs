use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::brakes::EP_DEMAND_RELEASE;
use crate::config::OVERCHARGE_PSI;

/// Automatic brake valve handle positions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum ControllerPosition {
    /// Brake valve cut out: the lead neither charges nor vents the pipe.
    Neutral,
    #[default]
    Release,
    Lap,
    Apply,
    Emergency,
    Overcharge,
    FullQuickRelease,
}

impl ControllerPosition {
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Neutral => 0,
            Self::Release => 1,
            Self::Lap => 2,
            Self::Apply => 3,
            Self::Emergency => 4,
            Self::Overcharge => 5,
            Self::FullQuickRelease => 6,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Neutral),
            1 => Some(Self::Release),
            2 => Some(Self::Lap),
            3 => Some(Self::Apply),
            4 => Some(Self::Emergency),
            5 => Some(Self::Overcharge),
            6 => Some(Self::FullQuickRelease),
            _ => None,
        }
    }

    /// Positions that charge the pipe at the quick rate.
    pub fn is_quick_charge(self) -> bool {
        matches!(self, Self::Overcharge | Self::FullQuickRelease)
    }
}

/// Driver's brake valve state for one train.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct BrakeController {
    pub position: ControllerPosition,
    /// Target brake pipe pressure at the lead.
    pub equalizing_reservoir_psi: f32,
    /// Target engine brake line pressure.
    pub engine_brake_line_psi: f32,
    /// Electro-pneumatic demand, see [`crate::brakes::EP_DEMAND_RELEASE`].
    pub ep_demand: f32,
    pub bail_off: bool,
    /// Fully charged brake pipe pressure.
    pub max_pressure_psi: f32,
    /// Brake pipe pressure of a full service application.
    pub full_service_psi: f32,
}

impl Default for BrakeController {
    fn default() -> Self {
        Self {
            position: ControllerPosition::Release,
            equalizing_reservoir_psi: 90.0,
            engine_brake_line_psi: 0.0,
            ep_demand: EP_DEMAND_RELEASE,
            bail_off: false,
            max_pressure_psi: 90.0,
            full_service_psi: 64.0,
        }
    }
}

impl BrakeController {
    pub fn release(&mut self) {
        self.position = ControllerPosition::Release;
        self.equalizing_reservoir_psi = self.max_pressure_psi;
    }

    /// Charge the pipe above full pressure at the quick rate.
    pub fn overcharge(&mut self) {
        self.position = ControllerPosition::Overcharge;
        self.equalizing_reservoir_psi = self.max_pressure_psi + OVERCHARGE_PSI;
    }

    pub fn lap(&mut self) {
        self.position = ControllerPosition::Lap;
    }

    /// Service application to `target_psi`, never below full service.
    pub fn service(&mut self, target_psi: f32) {
        self.position = ControllerPosition::Apply;
        self.equalizing_reservoir_psi = target_psi
            .max(self.full_service_psi)
            .min(self.max_pressure_psi);
    }

    pub fn emergency(&mut self) {
        self.position = ControllerPosition::Emergency;
        self.equalizing_reservoir_psi = 0.0;
    }

    pub fn is_emergency(&self) -> bool {
        self.position == ControllerPosition::Emergency
    }
}
