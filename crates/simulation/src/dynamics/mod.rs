//! Per-car forces that follow from the brakes and the track: curve
//! resistance, coupler slack and force, and wheel-climb derailment risk.
//!
//! Speeds, motive forces and track geometry are inputs written by the motion
//! integrator; this module only computes forces and flags from them.

mod coupler;
mod curve;
mod derailment;
mod systems;


pub use coupler::{integrate_slack, net_longitudinal_force_n, solve_coupler_forces, CouplerScratch};
pub use curve::{
    curve_resistance_n, curve_speed_factor, equal_load_speed_mps, exponential_filter,
    rigid_wheelbase_m, update_curve_force,
};
pub use derailment::{
    coupler_angle_rad, default_nadal_limit, nadal_limit, update_derailment_risk,
    DerailmentTransition,
};
pub use systems::{
    log_derailment_warnings, step_train_dynamics, update_train_dynamics, TrainDynamicsPlugin,
};
