//! Electro-pneumatic holding valve.
//!
//! On EP cars the cylinder is driven directly from the main reservoir pipe
//! according to a train-wide demand signal. The holding valve decides whether
//! the triple valve's release path is open: while lapped, a release on the
//! brake pipe cannot exhaust the cylinder.

use super::car::AirBrake;
use super::types::ValveState;

/// Demand value meaning "release".
pub const EP_DEMAND_RELEASE: f32 = -1.0;
/// Demand value meaning "hold current cylinder pressure".
pub const EP_DEMAND_LAP: f32 = 0.0;

impl AirBrake {
    /// Set the holding valve from `demand` and return the demanded cylinder
    /// pressure (zero for release and lap).
    ///
    /// A positive demand laps the valve while the cylinder is at or below the
    /// demanded pressure and opens it to release once the cylinder is above.
    pub(crate) fn set_holding_valve(&mut self, demand: f32) -> f32 {
        if !demand.is_finite() || demand < EP_DEMAND_LAP {
            self.holding_valve = ValveState::Release;
            return 0.0;
        }
        if demand == EP_DEMAND_LAP {
            self.holding_valve = ValveState::Lap;
            return 0.0;
        }
        let demanded_psi = demand.min(1.0) * self.params.max_cylinder_psi;
        self.holding_valve = if self.auto_cyl_psi <= demanded_psi {
            ValveState::Lap
        } else {
            ValveState::Release
        };
        demanded_psi
    }

    /// Top the cylinder up toward `demanded_psi` from the main reservoir pipe.
    pub(crate) fn supply_ep_demand(&mut self, dt: f32, demanded_psi: f32) {
        if self.auto_cyl_psi >= demanded_psi {
            return;
        }
        // Pressure drop in the second pipe per psi gained in the cylinder.
        let scale = self.aux_brake_line_volume_ratio / self.params.aux_cyl_volume_ratio;
        let mut dp = dt * self.params.max_application_rate_psi_s;
        if self.second_pipe_psi - dp * scale < self.auto_cyl_psi + dp {
            dp = (self.second_pipe_psi - self.auto_cyl_psi) / (1.0 + scale);
        }
        dp = dp.min(demanded_psi - self.auto_cyl_psi).max(0.0);
        self.second_pipe_psi -= dp * scale;
        self.auto_cyl_psi += dp;
    }
}
