//! Consist-level brake operations: hoses, cocks, retainers, handbrakes and
//! initialization.

use bevy::log::debug;

use crate::brakes::{BrakeInit, RetainerSetting, ValveState};

use super::controller::BrakeController;
use super::types::{RailCar, Train};

impl Train {
    /// Build a train from `cars`, front to rear. The first locomotive leads.
    /// Hoses are connected and the brakes charged to the controller's
    /// maximum pressure.
    pub fn new(name: impl Into<String>, cars: Vec<RailCar>) -> Self {
        let lead_locomotive = cars.iter().position(RailCar::is_locomotive);
        let mut train = Self {
            id: 0,
            name: name.into(),
            cars,
            lead_locomotive,
            controller: BrakeController::default(),
            engine_brake_state: ValveState::Lap,
            retainer: RetainerSetting::Exhaust,
            retainer_percent: 100,
        };
        train.connect_brake_hoses();
        train.initialize_brakes(false, true);
        train
    }

    pub fn with_controller(mut self, controller: BrakeController) -> Self {
        self.controller = controller;
        self.initialize_brakes(false, true);
        self
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Connect every hose and open every cock, then close the front cock of
    /// the first car and the rear cock of the last.
    pub fn connect_brake_hoses(&mut self) {
        for car in &mut self.cars {
            car.brake.front_hose_connected = true;
            car.brake.angle_cock_a_open = true;
            car.brake.angle_cock_b_open = true;
        }
        if let Some(first) = self.cars.first_mut() {
            first.brake.front_hose_connected = false;
            first.brake.angle_cock_a_open = false;
        }
        if let Some(last) = self.cars.last_mut() {
            last.brake.angle_cock_b_open = false;
        }
    }

    /// Disconnect every hose and close every cock.
    pub fn disconnect_brake_hoses(&mut self) {
        for car in &mut self.cars {
            car.brake.front_hose_connected = false;
            car.brake.angle_cock_a_open = false;
            car.brake.angle_cock_b_open = false;
        }
    }

    /// Part the hose between car `index` and the car behind it. With
    /// `close_cocks` the cocks either side are closed first, as a crew would
    /// before uncoupling; without, both ends vent.
    pub fn uncouple_hoses_after(&mut self, index: usize, close_cocks: bool) -> bool {
        if index + 1 >= self.cars.len() {
            return false;
        }
        if close_cocks {
            self.cars[index].brake.angle_cock_b_open = false;
            self.cars[index + 1].brake.angle_cock_a_open = false;
        }
        self.cars[index + 1].brake.front_hose_connected = false;
        true
    }

    /// Reconnect the hose between car `index` and the car behind it and open
    /// the cocks either side.
    pub fn couple_hoses_after(&mut self, index: usize) -> bool {
        if index + 1 >= self.cars.len() {
            return false;
        }
        self.cars[index].brake.angle_cock_b_open = true;
        self.cars[index + 1].brake.angle_cock_a_open = true;
        self.cars[index + 1].brake.front_hose_connected = true;
        true
    }

    /// Set `setting` on the first `percent` of non-locomotive cars and
    /// exhaust on the rest.
    pub fn set_retainers(&mut self, setting: RetainerSetting, percent: u8) {
        let percent = percent.min(100);
        let wagons = self.cars.iter().filter(|c| !c.is_locomotive()).count();
        let retained = (wagons * usize::from(percent)).div_ceil(100);
        let mut seen = 0;
        for car in self.cars.iter_mut().filter(|c| !c.is_locomotive()) {
            let car_setting = if seen < retained {
                setting
            } else {
                RetainerSetting::Exhaust
            };
            car.brake.set_retainer(car_setting);
            seen += 1;
        }
        self.retainer = setting;
        self.retainer_percent = percent;
        debug!(
            "Train {}: retainers {} on {}/{} cars",
            self.id,
            setting.label(),
            retained,
            wagons
        );
    }

    pub fn set_handbrakes(&mut self, percent: f32) {
        for car in &mut self.cars {
            car.brake.set_handbrake(percent);
        }
    }

    /// Charge every car to the controller's current equalizing reservoir
    /// pressure and fill every main reservoir.
    pub fn initialize_brakes(&mut self, handbrake_on: bool, immediate_release: bool) {
        self.controller.equalizing_reservoir_psi = self
            .controller
            .equalizing_reservoir_psi
            .clamp(0.0, self.controller.max_pressure_psi.max(0.0));
        let max_main_res_psi = self
            .lead_air_params()
            .map_or(0.0, |params| params.max_main_res_psi);
        let init = BrakeInit {
            brake_pipe_psi: self.controller.equalizing_reservoir_psi,
            second_pipe_psi: max_main_res_psi,
            max_pressure_psi: self.controller.max_pressure_psi,
            full_service_psi: self.controller.full_service_psi,
            handbrake_on,
            immediate_release,
        };
        for car in &mut self.cars {
            car.brake.initialize(&init);
            if let Some(loco) = car.locomotive.as_mut() {
                loco.main_res_psi = loco.params.max_main_res_psi;
                loco.compressor_on = false;
                car.brake.second_pipe_psi = loco.main_res_psi;
            }
        }
        self.engine_brake_state = ValveState::Lap;
    }

    /// Initialize for a train that is already running: released, fully
    /// charged, no handbrakes.
    pub fn initialize_moving(&mut self) {
        self.controller.release();
        let pipe = self.controller.max_pressure_psi;
        for car in &mut self.cars {
            car.brake.full_service_psi = self.controller.full_service_psi;
            car.brake.initialize_moving(pipe);
            if let Some(loco) = car.locomotive.as_mut() {
                loco.main_res_psi = loco.params.max_main_res_psi;
                car.brake.second_pipe_psi = loco.main_res_psi;
            }
        }
    }

    pub(crate) fn lead_air_params(&self) -> Option<super::locomotive::LocomotiveAirParams> {
        let index = self.lead_locomotive?;
        self.cars
            .get(index)?
            .locomotive
            .as_ref()
            .map(|loco| loco.params)
    }

    /// Contiguous run of locomotives around the lead, as `(first, last)`.
    pub fn lead_span(&self) -> Option<(usize, usize)> {
        let lead = self.lead_locomotive?;
        if !self.cars.get(lead)?.is_locomotive() {
            return None;
        }
        let mut first = lead;
        while first > 0 && self.cars[first - 1].is_locomotive() {
            first -= 1;
        }
        let mut last = lead;
        while last + 1 < self.cars.len() && self.cars[last + 1].is_locomotive() {
            last += 1;
        }
        Some((first, last))
    }

    /// Brake pipe diffusion time constant: the lead's, or the fallback.
    pub fn brake_pipe_time_factor_s(&self, fallback_s: f32) -> f32 {
        let factor = self
            .lead_air_params()
            .map_or(fallback_s, |params| params.brake_pipe_time_factor_s);
        if factor.is_finite() && factor > 0.0 {
            factor
        } else if fallback_s.is_finite() && fallback_s > 0.0 {
            fallback_s
        } else {
            crate::config::DEFAULT_BRAKE_PIPE_TIME_FACTOR_S
        }
    }

    /// Brake pipe pressure at the lead (or the first car).
    pub fn lead_pipe_psi(&self) -> f32 {
        self.lead_locomotive
            .or(if self.cars.is_empty() { None } else { Some(0) })
            .and_then(|i| self.cars.get(i))
            .map_or(0.0, |car| car.brake.brake_pipe_psi)
    }
}
