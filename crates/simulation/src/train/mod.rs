//! Trains: consists of cars, the driver's brake valve, and the propagation
//! of air along the brake pipe.
//!
//! A [`Train`] owns its cars in front-to-rear order. Cars never refer to the
//! train or to each other except by index. All trains live in the
//! [`TrainRoster`] resource and are stepped once per fixed tick by
//! [`update_train_brakes`].

mod commands;
mod consist;
mod controller;
mod locomotive;
mod main_reservoir;
mod persist;
mod propagation;
mod status;
mod systems;
mod types;


pub use commands::{BrakeCommand, BrakeCommandKind, CarEnd, CommandError};
pub use controller::{BrakeController, ControllerPosition};
pub use locomotive::{LocomotiveAir, LocomotiveAirParams, TractionKind};
pub use main_reservoir::main_reservoir_span;
pub use propagation::{
    brake_pipe_linked, propagate_brake_pressures, step_train_brakes, substep_count,
    PropagationScratch,
};
pub use systems::{apply_brake_commands, update_train_brakes, TrainBrakesPlugin};
pub use types::{CarDynamics, CarKind, CarPhysics, RailCar, Train, TrainId, TrainRoster};
