//! Per-car air brake state.

use std::f32::consts::PI;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{
    BRAKE_HOSE_ALLOWANCE_M, BRAKE_PIPE_DIAMETER_M, DEFAULT_AUX_BRAKE_LINE_VOLUME_RATIO,
    MIN_BRAKE_PIPE_LENGTH_M,
};

use super::params::CarBrakeParams;
use super::triggers::PressureTriggers;
use super::types::{retainer_effect, BrakeCapabilities, RetainerSetting, ValveState};

/// Brake pipe volume of a car `car_length_m` long, including the hose
/// allowance and the minimum-length floor.
pub fn brake_pipe_volume_m3(car_length_m: f32) -> f32 {
    let length = if car_length_m.is_finite() {
        car_length_m.max(0.0)
    } else {
        0.0
    };
    let effective = (length + BRAKE_HOSE_ALLOWANCE_M).max(MIN_BRAKE_PIPE_LENGTH_M);
    BRAKE_PIPE_DIAMETER_M * BRAKE_PIPE_DIAMETER_M * PI / 4.0 * effective
}

/// Initial conditions for [`AirBrake::initialize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrakeInit {
    /// Brake pipe pressure the train is charged to (equalizing reservoir).
    pub brake_pipe_psi: f32,
    /// Main reservoir pipe pressure; zero on single-pipe trains.
    pub second_pipe_psi: f32,
    /// Rated brake pipe pressure for the train.
    pub max_pressure_psi: f32,
    pub full_service_psi: f32,
    pub handbrake_on: bool,
    /// Start with the cylinder exhausted even if the pipe is reduced.
    pub immediate_release: bool,
}

/// Pneumatic state of one car's brake equipment. Pressures are psi gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct AirBrake {
    pub params: CarBrakeParams,
    pub(crate) caps: BrakeCapabilities,
    pub(crate) car_length_m: f32,
    pub(crate) brake_pipe_volume_m3: f32,
    pub(crate) aux_brake_line_volume_ratio: f32,
    pub(crate) cyl_volume_m3: f32,

    pub brake_pipe_psi: f32,
    /// Main reservoir pipe on twin-pipe and EP cars.
    pub second_pipe_psi: f32,
    /// Independent engine brake line. Non-zero only on locomotives in the
    /// lead consist.
    pub engine_line_psi: f32,
    pub aux_res_psi: f32,
    /// Emergency reservoir. Also the control reference for quick release
    /// and graduated release.
    pub emergency_res_psi: f32,
    pub full_service_psi: f32,
    pub(crate) auto_cyl_psi: f32,
    pub(crate) cyl_psi: f32,

    pub handbrake_percent: f32,
    pub retainer: RetainerSetting,
    pub retainer_threshold_psi: f32,
    pub release_rate_psi_s: f32,

    pub triple_valve: ValveState,
    pub holding_valve: ValveState,

    pub front_hose_connected: bool,
    pub angle_cock_a_open: bool,
    pub angle_cock_b_open: bool,
    pub bleed_off_valve_open: bool,
    pub bail_off_on: bool,
    pub brakes_stuck: bool,

    pub brake_force_n: f32,
    pub brake_retard_force_n: f32,

    pub(crate) triggers: PressureTriggers,
}

impl AirBrake {
    pub fn new(mut params: CarBrakeParams, car_length_m: f32) -> Self {
        params.sanitize();
        let release_rate_psi_s = params.max_release_rate_psi_s;
        let mut brake = Self {
            caps: params.capabilities(),
            params,
            car_length_m,
            brake_pipe_volume_m3: 0.0,
            aux_brake_line_volume_ratio: DEFAULT_AUX_BRAKE_LINE_VOLUME_RATIO,
            cyl_volume_m3: 0.0,
            brake_pipe_psi: 0.0,
            second_pipe_psi: 0.0,
            engine_line_psi: 0.0,
            aux_res_psi: 0.0,
            emergency_res_psi: 0.0,
            full_service_psi: 0.0,
            auto_cyl_psi: 0.0,
            cyl_psi: 0.0,
            handbrake_percent: 0.0,
            retainer: RetainerSetting::Exhaust,
            retainer_threshold_psi: 0.0,
            release_rate_psi_s,
            triple_valve: ValveState::Release,
            holding_valve: ValveState::Release,
            front_hose_connected: true,
            angle_cock_a_open: true,
            angle_cock_b_open: true,
            bleed_off_valve_open: false,
            bail_off_on: false,
            brakes_stuck: false,
            brake_force_n: 0.0,
            brake_retard_force_n: 0.0,
            triggers: PressureTriggers::default(),
        };
        brake.derive_volumes();
        brake
    }

    /// Recompute pipe volume and the volume ratios that depend on it.
    fn derive_volumes(&mut self) {
        self.caps = self.params.capabilities();
        self.brake_pipe_volume_m3 = brake_pipe_volume_m3(self.car_length_m);
        let aux_volume = self.params.emergency_res_volume_m3 / self.params.emerg_aux_volume_ratio;
        self.aux_brake_line_volume_ratio = if aux_volume > 0.0 {
            aux_volume / self.brake_pipe_volume_m3
        } else {
            DEFAULT_AUX_BRAKE_LINE_VOLUME_RATIO
        };
        self.cyl_volume_m3 = aux_volume / self.params.aux_cyl_volume_ratio;
    }

    /// Charge the car to the given conditions. Derived volumes are
    /// recomputed first.
    pub fn initialize(&mut self, init: &BrakeInit) {
        self.derive_volumes();
        let max_pressure = init.max_pressure_psi.max(0.0);
        let pipe = init.brake_pipe_psi.clamp(0.0, max_pressure);

        self.brake_pipe_psi = pipe;
        self.second_pipe_psi = if self.caps.two_pipes {
            init.second_pipe_psi.max(0.0)
        } else {
            0.0
        };
        self.engine_line_psi = 0.0;
        self.full_service_psi = init.full_service_psi.max(0.0);
        self.aux_res_psi = pipe;
        self.emergency_res_psi = if self.caps.emergency_reservoir || self.caps.distributor {
            max_pressure
        } else {
            pipe
        };

        let reduction = (max_pressure - pipe) * self.params.aux_cyl_volume_ratio;
        self.auto_cyl_psi = if init.immediate_release {
            0.0
        } else {
            reduction.clamp(0.0, self.params.max_cylinder_psi)
        };
        self.cyl_psi = self.auto_cyl_psi;

        self.triple_valve = if self.auto_cyl_psi > 0.0 {
            ValveState::Lap
        } else {
            ValveState::Release
        };
        self.holding_valve = ValveState::Release;
        self.handbrake_percent = if init.handbrake_on && self.caps.handbrake {
            100.0
        } else {
            0.0
        };
        self.bleed_off_valve_open = false;
        self.bail_off_on = false;
        self.set_retainer(self.retainer);
        self.triggers = PressureTriggers::primed(self.cyl_psi, self.brake_pipe_psi);
        self.update_brake_force();
    }

    /// Start already running with brakes released and fully charged.
    pub fn initialize_moving(&mut self, brake_pipe_psi: f32) {
        self.derive_volumes();
        let pipe = brake_pipe_psi.max(0.0);
        self.brake_pipe_psi = pipe;
        self.aux_res_psi = pipe;
        self.emergency_res_psi = pipe;
        self.auto_cyl_psi = 0.0;
        self.cyl_psi = self.engine_line_psi.max(0.0);
        self.handbrake_percent = 0.0;
        self.triple_valve = ValveState::Release;
        self.holding_valve = ValveState::Release;
        self.bleed_off_valve_open = false;
        self.triggers = PressureTriggers::primed(self.cyl_psi, self.brake_pipe_psi);
        self.update_brake_force();
    }

    pub fn set_retainer(&mut self, setting: RetainerSetting) {
        let effect = retainer_effect(
            setting,
            self.params.retainer_positions,
            self.params.max_release_rate_psi_s,
        );
        self.retainer = setting;
        self.retainer_threshold_psi = effect.threshold_psi;
        self.release_rate_psi_s = effect.release_rate_psi_s;
    }

    /// Set the handbrake. Ignored on cars without one.
    pub fn set_handbrake(&mut self, percent: f32) {
        self.handbrake_percent = if self.caps.handbrake && percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.update_brake_force();
    }

    pub fn capabilities(&self) -> BrakeCapabilities {
        self.caps
    }

    pub fn brake_pipe_volume_m3(&self) -> f32 {
        self.brake_pipe_volume_m3
    }

    pub fn aux_brake_line_volume_ratio(&self) -> f32 {
        self.aux_brake_line_volume_ratio
    }

    pub fn cylinder_volume_m3(&self) -> f32 {
        self.cyl_volume_m3
    }

    /// Cylinder pressure from the automatic brake alone.
    pub fn train_brake_cylinder_psi(&self) -> f32 {
        self.auto_cyl_psi
    }

    /// Effective cylinder pressure: the greater of the automatic brake and
    /// the engine brake line.
    pub fn cylinder_psi(&self) -> f32 {
        self.cyl_psi
    }

    pub fn is_braking(&self) -> bool {
        self.cyl_psi > 0.0 || self.handbrake_percent > 0.0
    }

    /// Pressures that must never go negative.
    pub fn pressures(&self) -> [f32; 7] {
        [
            self.brake_pipe_psi,
            self.second_pipe_psi,
            self.engine_line_psi,
            self.aux_res_psi,
            self.emergency_res_psi,
            self.auto_cyl_psi,
            self.cyl_psi,
        ]
    }

    pub(crate) fn refresh_cylinder(&mut self) {
        self.cyl_psi = self.auto_cyl_psi.max(self.engine_line_psi);
    }

    pub(crate) fn update_brake_force(&mut self) {
        let p = &self.params;
        let handbrake_n = p.max_handbrake_force_n * self.handbrake_percent / 100.0;
        let shoe_force_n = if self.brakes_stuck {
            p.max_brake_force_n.max(p.max_handbrake_force_n / 2.0)
        } else {
            let fraction = (self.cyl_psi / p.max_cylinder_psi).clamp(0.0, 1.0);
            (p.max_brake_force_n * fraction).max(handbrake_n)
        };
        self.brake_force_n = shoe_force_n;
        self.brake_retard_force_n = shoe_force_n * p.brake_shoe_friction_factor;
    }
}
