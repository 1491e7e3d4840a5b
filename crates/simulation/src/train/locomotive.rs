use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::events::{BrakeSignal, SignalSink};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum TractionKind {
    #[default]
    Diesel,
    Electric,
    Steam,
}

/// Air supply and brake valve parameters of a locomotive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct LocomotiveAirParams {
    pub traction: TractionKind,
    pub main_res_volume_m3: f32,
    pub max_main_res_psi: f32,
    /// Compressor cuts in below this.
    pub compressor_restart_psi: f32,
    pub main_res_charging_rate_psi_s: f32,
    pub brake_pipe_charging_rate_psi_s: f32,
    pub brake_pipe_quick_charging_rate_psi_s: f32,
    /// Diffusion time constant of the brake pipe between adjacent cars.
    pub brake_pipe_time_factor_s: f32,
    /// Time constant of a service reduction at the lead.
    pub brake_service_time_factor_s: f32,
    pub brake_emergency_time_factor_s: f32,
    pub brake_pipe_leak_rate_psi_s: f32,
    pub engine_brake_apply_rate_psi_s: f32,
    pub engine_brake_release_rate_psi_s: f32,
}

impl Default for LocomotiveAirParams {
    fn default() -> Self {
        Self {
            traction: TractionKind::Diesel,
            main_res_volume_m3: 0.3,
            max_main_res_psi: 140.0,
            compressor_restart_psi: 110.0,
            main_res_charging_rate_psi_s: 0.4,
            brake_pipe_charging_rate_psi_s: 21.0,
            brake_pipe_quick_charging_rate_psi_s: 80.0,
            brake_pipe_time_factor_s: 0.0015,
            brake_service_time_factor_s: 1.009,
            brake_emergency_time_factor_s: 0.1,
            brake_pipe_leak_rate_psi_s: 0.0,
            engine_brake_apply_rate_psi_s: 12.5,
            engine_brake_release_rate_psi_s: 12.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct LocomotiveAir {
    pub params: LocomotiveAirParams,
    pub main_res_psi: f32,
    pub compressor_on: bool,
    /// Engine running. Bail-off and the compressor need power.
    pub power_on: bool,
}

impl LocomotiveAir {
    pub fn new(params: LocomotiveAirParams) -> Self {
        Self {
            main_res_psi: params.max_main_res_psi,
            params,
            compressor_on: false,
            power_on: true,
        }
    }

    /// Main reservoir volume, floored so that pressure bookkeeping never
    /// divides by zero.
    pub fn main_res_volume_m3(&self) -> f32 {
        self.params.main_res_volume_m3.max(1e-4)
    }

    /// Run the compressor governor and charge the main reservoir.
    pub fn update_compressor(&mut self, elapsed_s: f32, car_index: usize, signals: &mut SignalSink) {
        let p = &self.params;
        if self.compressor_on {
            if self.main_res_psi >= p.max_main_res_psi || !self.power_on {
                self.compressor_on = false;
                signals.emit(car_index, BrakeSignal::CompressorOff);
            }
        } else if self.power_on && self.main_res_psi < p.compressor_restart_psi {
            self.compressor_on = true;
            signals.emit(car_index, BrakeSignal::CompressorOn);
        }

        if self.compressor_on {
            self.main_res_psi = (self.main_res_psi + p.main_res_charging_rate_psi_s * elapsed_s)
                .min(p.max_main_res_psi);
        }
    }
}
