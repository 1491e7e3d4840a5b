//! Commanded brake inputs.
//!
//! Controller and scenario logic never write car state directly; they send
//! [`BrakeCommand`] events which are applied at the start of the next fixed
//! tick, before any pressure is propagated.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::brakes::RetainerSetting;

use super::controller::ControllerPosition;
use super::types::{Train, TrainId};

/// One end of a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarEnd {
    Front,
    Rear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BrakeCommandKind {
    /// Move the automatic brake handle. `equalizing_reservoir_psi` is the
    /// service target for Apply and ignored by the other positions.
    SetController {
        position: ControllerPosition,
        equalizing_reservoir_psi: f32,
    },
    SetEngineBrake {
        line_psi: f32,
    },
    SetEpDemand {
        demand: f32,
    },
    SetBailOff {
        on: bool,
    },
    SetRetainers {
        setting: RetainerSetting,
        percent: u8,
    },
    SetHandbrakes {
        percent: f32,
    },
    SetHandbrake {
        car_index: usize,
        percent: f32,
    },
    SetBleedOff {
        car_index: usize,
        open: bool,
    },
    SetAngleCock {
        car_index: usize,
        end: CarEnd,
        open: bool,
    },
    /// Couple or part the hose between `car_index` and the car behind it.
    SetHoseConnected {
        car_index: usize,
        connected: bool,
    },
    SetPower {
        car_index: usize,
        on: bool,
    },
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct BrakeCommand {
    pub train: TrainId,
    pub kind: BrakeCommandKind,
}

/// Why a command could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    UnknownCar(usize),
    NotALocomotive(usize),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::UnknownCar(index) => write!(f, "no car at index {index}"),
            CommandError::NotALocomotive(index) => write!(f, "car {index} is not a locomotive"),
        }
    }
}

impl std::error::Error for CommandError {}

impl Train {
    pub fn apply_command(&mut self, kind: BrakeCommandKind) -> Result<(), CommandError> {
        let car_count = self.cars.len();
        let car = |index: usize| {
            if index < car_count {
                Ok(index)
            } else {
                Err(CommandError::UnknownCar(index))
            }
        };

        match kind {
            BrakeCommandKind::SetController {
                position,
                equalizing_reservoir_psi,
            } => self.set_controller(position, equalizing_reservoir_psi),
            BrakeCommandKind::SetEngineBrake { line_psi } => {
                self.controller.engine_brake_line_psi = if line_psi.is_finite() {
                    line_psi.max(0.0)
                } else {
                    0.0
                };
            }
            BrakeCommandKind::SetEpDemand { demand } => {
                self.controller.ep_demand = if demand.is_finite() {
                    demand.min(1.0)
                } else {
                    crate::brakes::EP_DEMAND_RELEASE
                };
            }
            BrakeCommandKind::SetBailOff { on } => self.controller.bail_off = on,
            BrakeCommandKind::SetRetainers { setting, percent } => {
                self.set_retainers(setting, percent);
            }
            BrakeCommandKind::SetHandbrakes { percent } => self.set_handbrakes(percent),
            BrakeCommandKind::SetHandbrake { car_index, percent } => {
                let i = car(car_index)?;
                self.cars[i].brake.set_handbrake(percent);
            }
            BrakeCommandKind::SetBleedOff { car_index, open } => {
                let i = car(car_index)?;
                self.cars[i].brake.bleed_off_valve_open = open;
            }
            BrakeCommandKind::SetAngleCock {
                car_index,
                end,
                open,
            } => {
                let brake = &mut self.cars[car(car_index)?].brake;
                match end {
                    CarEnd::Front => brake.angle_cock_a_open = open,
                    CarEnd::Rear => brake.angle_cock_b_open = open,
                }
            }
            BrakeCommandKind::SetHoseConnected {
                car_index,
                connected,
            } => {
                let i = car(car_index)?;
                car(i + 1)?;
                self.cars[i + 1].brake.front_hose_connected = connected;
            }
            BrakeCommandKind::SetPower { car_index, on } => {
                let i = car(car_index)?;
                let loco = self.cars[i]
                    .locomotive
                    .as_mut()
                    .ok_or(CommandError::NotALocomotive(i))?;
                loco.power_on = on;
            }
        }
        Ok(())
    }

    fn set_controller(&mut self, position: ControllerPosition, equalizing_reservoir_psi: f32) {
        let controller = &mut self.controller;
        match position {
            ControllerPosition::Release | ControllerPosition::FullQuickRelease => {
                controller.release();
                controller.position = position;
            }
            ControllerPosition::Overcharge => controller.overcharge(),
            ControllerPosition::Apply => controller.service(equalizing_reservoir_psi),
            ControllerPosition::Emergency => controller.emergency(),
            ControllerPosition::Lap | ControllerPosition::Neutral => {
                controller.position = position;
            }
        }
    }
}
