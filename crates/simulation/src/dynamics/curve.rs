//! Curve resistance.

use crate::brake_settings::BrakeSimSettings;
use crate::config::GRAVITY_MPS2;
use crate::train::{CarKind, CarPhysics, RailCar};

/// Rigid wheelbase of a car, estimated from its running gear when not given.
pub fn rigid_wheelbase_m(physics: &CarPhysics, kind: CarKind) -> f32 {
    if physics.rigid_wheelbase_m > 0.0 {
        return physics.rigid_wheelbase_m;
    }
    // Coupled driving wheels set the wheelbase of a steam locomotive.
    if physics.drive_axles > 1 {
        let spacing = 2.0 * physics.driver_wheel_radius_m.max(0.3) + 0.15;
        return (physics.drive_axles - 1) as f32 * spacing;
    }
    if physics.bogies == 0 {
        return (physics.length_m.max(0.0) * 0.55).clamp(2.0, 9.0);
    }
    let passenger = matches!(kind, CarKind::Passenger);
    match physics.axles / physics.bogies {
        0..=2 if passenger => 2.59,
        0..=2 => 1.676,
        _ if passenger => 3.658,
        _ => 3.505,
    }
}

/// Speed at which superelevation exactly balances centrifugal force.
pub fn equal_load_speed_mps(radius_m: f32, superelevation_m: f32, gauge_m: f32) -> f32 {
    if radius_m <= 0.0 || gauge_m <= 0.0 || superelevation_m <= 0.0 {
        return 0.0;
    }
    (superelevation_m * GRAVITY_MPS2 * radius_m / gauge_m).sqrt()
}

/// Scale on curve resistance: 1 at the equal-load speed, falling away either
/// side toward 0.5.
pub fn curve_speed_factor(speed_mps: f32, equal_load_speed_mps: f32) -> f32 {
    if equal_load_speed_mps <= 0.0 {
        return 0.5;
    }
    let x = (speed_mps.abs() - equal_load_speed_mps) / equal_load_speed_mps;
    0.5 + 0.5 * (-x * x).exp()
}

/// Unscaled curve resistance in newtons.
pub fn curve_resistance_n(
    mass_kg: f32,
    friction: f32,
    gauge_m: f32,
    rigid_wheelbase_m: f32,
    radius_m: f32,
) -> f32 {
    if radius_m <= 0.0 || !radius_m.is_finite() {
        return 0.0;
    }
    (mass_kg * friction * (gauge_m + rigid_wheelbase_m) / (2.0 * radius_m) * GRAVITY_MPS2).max(0.0)
}

/// First-order low-pass step from `previous` toward `target`.
pub fn exponential_filter(previous: f32, target: f32, dt: f32, time_constant_s: f32) -> f32 {
    if time_constant_s <= 0.0 {
        return target;
    }
    previous + (target - previous) * (1.0 - (-dt.max(0.0) / time_constant_s).exp())
}

/// Recompute a car's curve force. Straight track zeroes it.
pub fn update_curve_force(car: &mut RailCar, settings: &BrakeSimSettings, dt: f32) {
    let radius = car.dynamics.curve_radius_m;
    if radius <= 0.0 || !radius.is_finite() {
        car.dynamics.curve_force_n = 0.0;
        car.dynamics.curve_force_filtered_n = 0.0;
        return;
    }
    let wheelbase = rigid_wheelbase_m(&car.physics, car.kind);
    let v_eq = equal_load_speed_mps(
        radius,
        car.dynamics.superelevation_m,
        settings.track_gauge_m,
    );
    let force = curve_resistance_n(
        car.physics.mass_kg,
        settings.wagon_coefficient_friction,
        settings.track_gauge_m,
        wheelbase,
        radius,
    ) * curve_speed_factor(car.dynamics.speed_mps, v_eq);

    car.dynamics.curve_force_n = force;
    car.dynamics.curve_force_filtered_n = exponential_filter(
        car.dynamics.curve_force_filtered_n,
        force,
        dt,
        settings.curve_force_filter_seconds,
    );
}
