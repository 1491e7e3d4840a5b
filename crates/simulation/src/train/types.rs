use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::brakes::{AirBrake, CarBrakeParams, RetainerSetting, ValveState};

use super::controller::BrakeController;
use super::locomotive::{LocomotiveAir, LocomotiveAirParams};

pub type TrainId = u32;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum CarKind {
    #[default]
    Freight,
    Passenger,
    Locomotive,
    Tender,
}

/// Mass and running-gear geometry of one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct CarPhysics {
    pub mass_kg: f32,
    pub length_m: f32,
    pub axles: u32,
    pub bogies: u32,
    /// Zero means "estimate from axle and bogie counts".
    pub rigid_wheelbase_m: f32,
    /// Steam locomotives only.
    pub drive_axles: u32,
    pub driver_wheel_radius_m: f32,
    /// Free travel of the rear coupler either side of centre.
    pub coupler_slack_limit_m: f32,
}

impl Default for CarPhysics {
    fn default() -> Self {
        Self {
            mass_kg: 50_000.0,
            length_m: 15.0,
            axles: 4,
            bogies: 2,
            rigid_wheelbase_m: 0.0,
            drive_axles: 0,
            driver_wheel_radius_m: 0.9,
            coupler_slack_limit_m: 0.05,
        }
    }
}

/// Per-car motion inputs and the forces computed from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct CarDynamics {
    /// Supplied by the motion integrator.
    pub speed_mps: f32,
    pub motive_force_n: f32,
    /// Zero on straight track.
    pub curve_radius_m: f32,
    pub superelevation_m: f32,

    /// Rear coupler displacement; positive is stretched.
    pub coupler_slack_m: f32,
    /// Rear coupler force; positive is compression.
    pub coupler_force_n: f32,
    pub curve_force_n: f32,
    pub curve_force_filtered_n: f32,
    pub wheel_lateral_force_n: f32,
    pub wheel_vertical_force_n: f32,
    pub derail_possible: bool,
    pub derail_expected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct RailCar {
    pub name: String,
    pub kind: CarKind,
    pub physics: CarPhysics,
    pub brake: AirBrake,
    pub locomotive: Option<LocomotiveAir>,
    pub dynamics: CarDynamics,
}

impl RailCar {
    pub fn wagon(
        name: impl Into<String>,
        kind: CarKind,
        physics: CarPhysics,
        brake: CarBrakeParams,
    ) -> Self {
        let brake = AirBrake::new(brake, physics.length_m);
        Self {
            name: name.into(),
            kind,
            physics,
            brake,
            locomotive: None,
            dynamics: CarDynamics::default(),
        }
    }

    pub fn locomotive(
        name: impl Into<String>,
        physics: CarPhysics,
        brake: CarBrakeParams,
        air: LocomotiveAirParams,
    ) -> Self {
        let mut car = Self::wagon(name, CarKind::Locomotive, physics, brake);
        car.locomotive = Some(LocomotiveAir::new(air));
        car
    }

    pub fn is_locomotive(&self) -> bool {
        self.locomotive.is_some()
    }
}

/// One consist: an ordered, owned array of cars plus the driver's brake
/// controller. Cars refer to each other only by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Train {
    pub id: TrainId,
    pub name: String,
    pub cars: Vec<RailCar>,
    pub lead_locomotive: Option<usize>,
    pub controller: BrakeController,
    pub engine_brake_state: ValveState,
    pub retainer: RetainerSetting,
    pub retainer_percent: u8,
}

/// Every train in the simulation.
#[derive(Resource, Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct TrainRoster {
    pub trains: Vec<Train>,
    next_id: TrainId,
}

impl TrainRoster {
    /// Take ownership of `train`, assign it a fresh id and return the id.
    pub fn add(&mut self, mut train: Train) -> TrainId {
        self.next_id += 1;
        train.id = self.next_id;
        info!(
            "Train {} '{}' registered with {} cars",
            train.id,
            train.name,
            train.cars.len()
        );
        self.trains.push(train);
        self.next_id
    }

    pub fn remove(&mut self, id: TrainId) -> Option<Train> {
        let index = self.trains.iter().position(|t| t.id == id)?;
        let train = self.trains.remove(index);
        info!("Train {} '{}' removed", train.id, train.name);
        Some(train)
    }

    pub fn get(&self, id: TrainId) -> Option<&Train> {
        self.trains.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TrainId) -> Option<&mut Train> {
        self.trains.iter_mut().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }
}

impl crate::Saveable for TrainRoster {
    const SAVE_KEY: &'static str = "train_roster";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.trains.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
