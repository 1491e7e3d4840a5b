//! Triple valve state machine and the per-car pressure update.

use crate::config::{
    EMERGENCY_MARGIN_PSI, NEAR_ZERO_PSI, QUICK_RELEASE_MIN_REFERENCE_PSI,
    QUICK_RELEASE_REFERENCE_SHARE, TRIPLE_VALVE_SENSITIVITY_PSI,
};
use crate::events::SignalSink;

use super::car::AirBrake;
use super::types::ValveState;

/// Pressures the triple valve compares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveInputs {
    pub brake_pipe_psi: f32,
    pub aux_res_psi: f32,
    /// Control reference (the emergency reservoir).
    pub reference_psi: f32,
    pub full_service_psi: f32,
}

/// Next triple valve state. Rules are checked in order and every comparison
/// is strict, so a pressure sitting exactly on a threshold keeps the current
/// state.
pub fn next_triple_valve_state(current: ValveState, inputs: &ValveInputs) -> ValveState {
    let ValveInputs {
        brake_pipe_psi: pipe,
        aux_res_psi: aux,
        reference_psi: reference,
        full_service_psi: full_service,
    } = *inputs;

    if pipe < full_service - EMERGENCY_MARGIN_PSI {
        ValveState::Emergency
    } else if pipe > aux + TRIPLE_VALVE_SENSITIVITY_PSI
        || (current == ValveState::Emergency && pipe > aux)
        || (reference > QUICK_RELEASE_MIN_REFERENCE_PSI
            && pipe > reference * QUICK_RELEASE_REFERENCE_SHARE)
    {
        ValveState::Release
    } else if current != ValveState::Emergency && pipe < aux - TRIPLE_VALVE_SENSITIVITY_PSI {
        ValveState::Apply
    } else if current == ValveState::Apply && pipe > aux {
        ValveState::Lap
    } else {
        current
    }
}

/// Per-car inputs that come from the train rather than the car.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarUpdateContext {
    pub car_index: usize,
    /// Electro-pneumatic demand: negative releases, zero laps, `(0, 1]` is
    /// the demanded share of max cylinder pressure.
    pub ep_demand: f32,
    /// Bail-off requested and this car is a powered locomotive.
    pub bail_off: bool,
    /// Emit pressure-change sound triggers for this car.
    pub track_pressure_changes: bool,
    pub sound_trigger_interval_s: f32,
}

impl Default for CarUpdateContext {
    fn default() -> Self {
        Self {
            car_index: 0,
            ep_demand: super::holding_valve::EP_DEMAND_RELEASE,
            bail_off: false,
            track_pressure_changes: false,
            sound_trigger_interval_s: 0.5,
        }
    }
}

impl AirBrake {
    /// Advance this car's valves and reservoirs by `elapsed_s`.
    pub fn update(&mut self, elapsed_s: f32, ctx: &CarUpdateContext, signals: &mut SignalSink) {
        let dt = elapsed_s.max(0.0);
        let ep_target = if self.caps.holding_valve {
            Some(self.set_holding_valve(ctx.ep_demand))
        } else {
            None
        };

        self.run_triple_valve(dt);

        if let Some(demanded_psi) = ep_target {
            self.supply_ep_demand(dt, demanded_psi);
        }

        self.bail_off_on = false;
        if ctx.bail_off {
            self.bail_off_on = true;
            self.auto_cyl_psi -= self.params.max_release_rate_psi_s * dt;
        }

        self.clamp_non_negative();
        self.refresh_cylinder();
        self.update_brake_force();

        if ctx.track_pressure_changes {
            let (cylinder, pipe) = (self.cyl_psi, self.brake_pipe_psi);
            self.triggers.update(
                dt,
                ctx.sound_trigger_interval_s,
                cylinder,
                pipe,
                ctx.car_index,
                signals,
            );
        }
    }

    fn valve_inputs(&self) -> ValveInputs {
        ValveInputs {
            brake_pipe_psi: self.brake_pipe_psi,
            aux_res_psi: self.aux_res_psi,
            reference_psi: self.emergency_res_psi,
            full_service_psi: self.full_service_psi,
        }
    }

    fn run_triple_valve(&mut self, dt: f32) {
        let mut threshold = self.retainer_threshold_psi;
        if self.caps.graduated_release() {
            let graduated = (self.emergency_res_psi - self.brake_pipe_psi)
                * self.params.aux_cyl_volume_ratio;
            threshold = threshold.max(graduated);
        }

        if self.bleed_off_valve_open && self.bleed_off_finished() {
            self.bleed_off_valve_open = false;
        }
        if self.bleed_off_valve_open {
            self.bleed_off(dt);
        } else {
            self.triple_valve = next_triple_valve_state(self.triple_valve, &self.valve_inputs());
        }

        match self.triple_valve {
            ValveState::Apply | ValveState::Emergency => self.apply_cylinder(dt, threshold),
            ValveState::Release if self.holding_valve == ValveState::Release => {
                self.release_cylinder(dt, threshold);
            }
            _ => {}
        }

        self.charge_aux_from_second_pipe(dt);
    }

    // -------------------------------------------------------------------------
    // Bleed-off
    // -------------------------------------------------------------------------

    fn bleed_off_finished(&self) -> bool {
        let emergency_empty =
            !self.caps.emergency_reservoir || self.emergency_res_psi < NEAR_ZERO_PSI;
        self.aux_res_psi < NEAR_ZERO_PSI && self.auto_cyl_psi < NEAR_ZERO_PSI && emergency_empty
    }

    fn bleed_off(&mut self, dt: f32) {
        let p = &self.params;
        self.aux_res_psi = (self.aux_res_psi - p.max_application_rate_psi_s * dt).max(0.0);
        self.auto_cyl_psi = (self.auto_cyl_psi - p.max_release_rate_psi_s * dt).max(0.0);
        if self.caps.emergency_reservoir {
            self.emergency_res_psi =
                (self.emergency_res_psi - p.emergency_res_charging_rate_psi_s * dt).max(0.0);
        }
        self.triple_valve = ValveState::Release;
    }

    // -------------------------------------------------------------------------
    // Application
    // -------------------------------------------------------------------------

    fn application_rate(&self) -> f32 {
        if self.triple_valve == ValveState::Emergency {
            self.params.emergency_application_rate_psi_s
        } else {
            self.params.max_application_rate_psi_s
        }
    }

    fn apply_cylinder(&mut self, dt: f32, threshold_psi: f32) {
        let ratio = self.params.aux_cyl_volume_ratio;
        let mut dp = dt * self.application_rate();

        // Cylinder and aux never cross.
        if self.aux_res_psi - dp / ratio < self.auto_cyl_psi + dp {
            dp = (self.aux_res_psi - self.auto_cyl_psi) * ratio / (1.0 + ratio);
        }
        if self.caps.two_pipes && dp > threshold_psi - self.auto_cyl_psi {
            dp = threshold_psi - self.auto_cyl_psi;
        }
        if self.auto_cyl_psi + dp > self.params.max_cylinder_psi {
            dp = self.params.max_cylinder_psi - self.auto_cyl_psi;
        }
        // Aux is not drawn below the brake pipe.
        if self.brake_pipe_psi > self.aux_res_psi - dp / ratio {
            dp = (self.aux_res_psi - self.brake_pipe_psi) * ratio;
        }
        let dp = dp.max(0.0);
        self.aux_res_psi -= dp / ratio;
        self.auto_cyl_psi += dp;

        if self.triple_valve == ValveState::Emergency && self.caps.emergency_reservoir {
            self.dump_emergency_reservoir(dt);
        }
    }

    fn dump_emergency_reservoir(&mut self, dt: f32) {
        let ratio = self.params.emerg_aux_volume_ratio;
        let mut dp = dt * self.params.emergency_application_rate_psi_s;
        if self.emergency_res_psi - dp < self.aux_res_psi + dp * ratio {
            dp = (self.emergency_res_psi - self.aux_res_psi) / (1.0 + ratio);
        }
        let dp = dp.max(0.0);
        self.emergency_res_psi -= dp;
        self.aux_res_psi += dp * ratio;
    }

    // -------------------------------------------------------------------------
    // Release and recharge
    // -------------------------------------------------------------------------

    fn release_cylinder(&mut self, dt: f32, threshold_psi: f32) {
        if self.auto_cyl_psi > threshold_psi {
            self.auto_cyl_psi =
                (self.auto_cyl_psi - self.release_rate_psi_s * dt).max(threshold_psi);
        }

        if self.bleed_off_valve_open {
            return;
        }
        if self.caps.distributor {
            self.equalize_reference(dt);
        } else if self.caps.emergency_reservoir {
            self.recharge_from_emergency(dt);
        }

        self.charge_aux_from_pipe(dt);
    }

    /// Graduated-release cars: aux and the control reference drift toward
    /// each other in whichever direction is needed.
    fn equalize_reference(&mut self, dt: f32) {
        let ratio = self.params.emerg_aux_volume_ratio;
        let rate = self.params.emergency_res_charging_rate_psi_s;
        if self.aux_res_psi > self.emergency_res_psi {
            let mut dp = dt * rate;
            if self.emergency_res_psi + dp > self.aux_res_psi - dp * ratio {
                dp = (self.aux_res_psi - self.emergency_res_psi) / (1.0 + ratio);
            }
            self.emergency_res_psi += dp;
            self.aux_res_psi -= dp * ratio;
        } else if self.aux_res_psi < self.emergency_res_psi {
            let mut dp = dt * rate;
            if self.emergency_res_psi - dp < self.aux_res_psi + dp * ratio {
                dp = (self.emergency_res_psi - self.aux_res_psi) / (1.0 + ratio);
            }
            self.emergency_res_psi -= dp;
            self.aux_res_psi += dp * ratio;
        }
    }

    /// Plain emergency reservoir: helps refill aux after a brake release, and
    /// is itself topped up from aux once aux is higher.
    fn recharge_from_emergency(&mut self, dt: f32) {
        let ratio = self.params.emerg_aux_volume_ratio;
        let rate = self.params.emergency_res_charging_rate_psi_s;
        if self.aux_res_psi < self.emergency_res_psi && self.aux_res_psi < self.brake_pipe_psi {
            let mut dp = dt * rate;
            if self.emergency_res_psi - dp < self.aux_res_psi + dp * ratio {
                dp = (self.emergency_res_psi - self.aux_res_psi) / (1.0 + ratio);
            }
            if self.brake_pipe_psi < self.aux_res_psi + dp * ratio {
                dp = (self.brake_pipe_psi - self.aux_res_psi) / ratio;
            }
            let dp = dp.max(0.0);
            self.emergency_res_psi -= dp;
            self.aux_res_psi += dp * ratio;
        }
        if self.aux_res_psi > self.emergency_res_psi {
            let mut dp = dt * rate;
            if self.emergency_res_psi + dp > self.aux_res_psi - dp * ratio {
                dp = (self.aux_res_psi - self.emergency_res_psi) / (1.0 + ratio);
            }
            self.emergency_res_psi += dp;
            self.aux_res_psi -= dp * ratio;
        }
    }

    fn charge_aux_from_pipe(&mut self, dt: f32) {
        let ratio = self.aux_brake_line_volume_ratio;
        let may_charge = !self.caps.two_pipes
            || self.caps.no_main_reservoir_aux_charging
            || self.second_pipe_psi < self.brake_pipe_psi;

        if self.aux_res_psi < self.brake_pipe_psi && may_charge && !self.bleed_off_valve_open {
            let mut dp = dt * self.params.max_aux_charging_rate_psi_s;
            if self.aux_res_psi + dp > self.brake_pipe_psi - dp * ratio {
                dp = (self.brake_pipe_psi - self.aux_res_psi) / (1.0 + ratio);
            }
            self.aux_res_psi += dp;
            self.brake_pipe_psi -= dp * ratio;
        }
        if self.aux_res_psi > self.brake_pipe_psi {
            let mut dp = dt * self.params.brake_insensitivity_psi_s;
            if self.aux_res_psi - dp < self.brake_pipe_psi + dp * ratio {
                dp = (self.aux_res_psi - self.brake_pipe_psi) / (1.0 + ratio);
            }
            self.aux_res_psi -= dp;
            self.brake_pipe_psi += dp * ratio;
        }
    }

    fn charge_aux_from_second_pipe(&mut self, dt: f32) {
        if !self.caps.two_pipes
            || self.caps.no_main_reservoir_aux_charging
            || self.bleed_off_valve_open
        {
            return;
        }
        let refill_allowed = self.second_pipe_psi > self.brake_pipe_psi
            || self.triple_valve != ValveState::Release;
        if self.aux_res_psi < self.second_pipe_psi
            && self.aux_res_psi < self.emergency_res_psi
            && refill_allowed
        {
            let ratio = self.aux_brake_line_volume_ratio;
            let mut dp = dt * self.params.max_aux_charging_rate_psi_s;
            if self.aux_res_psi + dp > self.second_pipe_psi - dp * ratio {
                dp = (self.second_pipe_psi - self.aux_res_psi) / (1.0 + ratio);
            }
            // Never past the control reference.
            dp = dp.min(self.emergency_res_psi - self.aux_res_psi).max(0.0);
            self.aux_res_psi += dp;
            self.second_pipe_psi -= dp * ratio;
        }
    }

    fn clamp_non_negative(&mut self) {
        for p in [
            &mut self.brake_pipe_psi,
            &mut self.second_pipe_psi,
            &mut self.engine_line_psi,
            &mut self.aux_res_psi,
            &mut self.emergency_res_psi,
            &mut self.auto_cyl_psi,
        ] {
            if p.is_nan() || *p < 0.0 {
                *p = 0.0;
            }
        }
    }
}
