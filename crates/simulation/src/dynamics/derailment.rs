//! Wheel-climb derailment risk from coupler forces on curves.

use crate::config::{
    COUPLER_LENGTH_M, DERAIL_POSSIBLE_SHARE, FLANGE_ANGLE_DEG, FLANGE_FRICTION, GRAVITY_MPS2,
};
use crate::train::RailCar;

/// Nadal limit on the lateral/vertical wheel force ratio.
pub fn nadal_limit(flange_angle_deg: f32, friction: f32) -> f32 {
    let tan = flange_angle_deg.to_radians().tan();
    (tan - friction) / (1.0 + friction * tan)
}

/// Default limit for the standard flange angle and friction.
pub fn default_nadal_limit() -> f32 {
    nadal_limit(FLANGE_ANGLE_DEG, FLANGE_FRICTION)
}

/// Angle between a coupler and the car axis when two cars of the given
/// lengths stand on a curve of `radius_m`.
pub fn coupler_angle_rad(length_a_m: f32, length_b_m: f32, radius_m: f32) -> f32 {
    if radius_m <= 0.0 || !radius_m.is_finite() {
        return 0.0;
    }
    let chord = length_a_m.max(0.0) + length_b_m.max(0.0) + 2.0 * COUPLER_LENGTH_M;
    (chord / (4.0 * radius_m)).min(std::f32::consts::FRAC_PI_4)
}

/// Car whose derailment-expected flag was raised this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerailmentTransition {
    pub car_index: usize,
    pub force_ratio: f32,
    pub limit: f32,
}

/// Recompute wheel forces and risk flags for every car. Cars whose
/// "expected" flag went from clear to set are pushed to `raised`.
pub fn update_derailment_risk(cars: &mut [RailCar], raised: &mut Vec<DerailmentTransition>) {
    let limit = default_nadal_limit();
    for i in 0..cars.len() {
        let radius = cars[i].dynamics.curve_radius_m;
        if radius <= 0.0 || !radius.is_finite() {
            let d = &mut cars[i].dynamics;
            d.wheel_lateral_force_n = 0.0;
            d.wheel_vertical_force_n = 0.0;
            d.derail_possible = false;
            d.derail_expected = false;
            continue;
        }

        let length = cars[i].physics.length_m;
        let mass = cars[i].physics.mass_kg.max(0.0);
        let axles = cars[i].physics.axles.max(1) as f32;
        let axles_per_end = (axles / 2.0).max(1.0);

        let front = if i > 0 {
            let force = cars[i - 1].dynamics.coupler_force_n.abs();
            force * coupler_angle_rad(cars[i - 1].physics.length_m, length, radius).sin()
        } else {
            0.0
        };
        let rear = if i + 1 < cars.len() {
            let force = cars[i].dynamics.coupler_force_n.abs();
            force * coupler_angle_rad(length, cars[i + 1].physics.length_m, radius).sin()
        } else {
            0.0
        };

        let was_expected = cars[i].dynamics.derail_expected;
        let d = &mut cars[i].dynamics;
        d.wheel_lateral_force_n = front.max(rear) / axles_per_end;
        d.wheel_vertical_force_n = mass * GRAVITY_MPS2 / (2.0 * axles);
        let ratio = if d.wheel_vertical_force_n > 0.0 {
            d.wheel_lateral_force_n / d.wheel_vertical_force_n
        } else {
            0.0
        };
        d.derail_possible = ratio >= DERAIL_POSSIBLE_SHARE * limit;
        d.derail_expected = ratio > limit;
        if d.derail_expected && !was_expected {
            raised.push(DerailmentTransition {
                car_index: i,
                force_ratio: ratio,
                limit,
            });
        }
    }
}
