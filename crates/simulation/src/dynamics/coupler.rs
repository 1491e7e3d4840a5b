//! Coupler slack and forces.
//!
//! Coupler `j` joins car `j` to car `j + 1` and is stored on car `j`. A
//! coupler inside its free slack carries no force. A coupler at a slack stop
//! is locked and carries whatever force keeps the two cars accelerating
//! together; solving every locked coupler at once gives a tri-diagonal
//! system in the coupler tensions.

use crate::config::STATIONARY_SPEED_MPS;
use crate::train::RailCar;

/// Reusable buffers for the coupler solve.
#[derive(Debug, Default)]
pub struct CouplerScratch {
    net_force: Vec<f32>,
    inv_mass: Vec<f32>,
    lower: Vec<f32>,
    diag: Vec<f32>,
    upper: Vec<f32>,
    rhs: Vec<f32>,
    c_prime: Vec<f32>,
    tension: Vec<f32>,
    free: Vec<bool>,
}

/// Longitudinal force on a car before couplers: motive force less brake and
/// curve resistance. A stationary car's resistance only cancels motive force.
pub fn net_longitudinal_force_n(car: &RailCar) -> f32 {
    let d = &car.dynamics;
    let resistance = car.brake.brake_retard_force_n.max(0.0) + d.curve_force_filtered_n.max(0.0);
    if d.speed_mps.abs() < STATIONARY_SPEED_MPS {
        let excess = (d.motive_force_n.abs() - resistance).max(0.0);
        excess.copysign(d.motive_force_n)
    } else {
        d.motive_force_n - resistance * d.speed_mps.signum()
    }
}

/// Advance every coupler's slack from the speeds of the cars either side.
pub fn integrate_slack(cars: &mut [RailCar], dt: f32) {
    let len = cars.len();
    for j in 0..len {
        if j + 1 == len {
            cars[j].dynamics.coupler_slack_m = 0.0;
            continue;
        }
        let closing = cars[j].dynamics.speed_mps - cars[j + 1].dynamics.speed_mps;
        let limit = cars[j].physics.coupler_slack_limit_m.max(0.0);
        let slack = &mut cars[j].dynamics.coupler_slack_m;
        *slack = (*slack + closing * dt.max(0.0)).clamp(-limit, limit);
    }
}

fn coupler_is_free(car: &RailCar) -> bool {
    let limit = car.physics.coupler_slack_limit_m;
    limit > 0.0 && car.dynamics.coupler_slack_m.abs() < limit
}

/// Solve `lower[j] x[j-1] + diag[j] x[j] + upper[j] x[j+1] = rhs[j]`.
fn thomas_solve(scratch: &mut CouplerScratch) {
    let n = scratch.diag.len();
    scratch.c_prime.clear();
    scratch.c_prime.resize(n, 0.0);
    scratch.tension.clear();
    scratch.tension.resize(n, 0.0);
    if n == 0 {
        return;
    }
    let CouplerScratch {
        lower,
        diag,
        upper,
        rhs,
        c_prime,
        tension: d_prime,
        ..
    } = scratch;

    let mut denom = diag[0];
    if denom.abs() < 1e-12 {
        return;
    }
    c_prime[0] = upper[0] / denom;
    d_prime[0] = rhs[0] / denom;
    for j in 1..n {
        denom = diag[j] - lower[j] * c_prime[j - 1];
        if denom.abs() < 1e-12 {
            c_prime[j] = 0.0;
            d_prime[j] = 0.0;
            continue;
        }
        c_prime[j] = upper[j] / denom;
        d_prime[j] = (rhs[j] - lower[j] * d_prime[j - 1]) / denom;
    }
    // Back substitution in place: d_prime becomes the solution.
    for j in (0..n - 1).rev() {
        d_prime[j] -= c_prime[j] * d_prime[j + 1];
    }
}

/// Solve coupler forces for the whole train and store them on each car
/// (positive is compression). Couplers that would pull a stretched stop
/// into compression, or push a compressed stop into tension, are released
/// into free slack and the system is solved again.
pub fn solve_coupler_forces(cars: &mut [RailCar], scratch: &mut CouplerScratch) {
    let len = cars.len();
    if len < 2 {
        for car in cars.iter_mut() {
            car.dynamics.coupler_force_n = 0.0;
        }
        return;
    }
    let couplers = len - 1;

    scratch.net_force.clear();
    scratch.net_force.extend(cars.iter().map(net_longitudinal_force_n));
    scratch.inv_mass.clear();
    scratch
        .inv_mass
        .extend(cars.iter().map(|car| 1.0 / car.physics.mass_kg.max(1.0)));
    scratch.free.clear();
    scratch
        .free
        .extend(cars[..couplers].iter().map(coupler_is_free));

    for _ in 0..=couplers {
        scratch.lower.clear();
        scratch.diag.clear();
        scratch.upper.clear();
        scratch.rhs.clear();
        for j in 0..couplers {
            if scratch.free[j] {
                scratch.lower.push(0.0);
                scratch.diag.push(1.0);
                scratch.upper.push(0.0);
                scratch.rhs.push(0.0);
                continue;
            }
            let (inv_front, inv_rear) = (scratch.inv_mass[j], scratch.inv_mass[j + 1]);
            scratch.lower.push(if j > 0 { inv_front } else { 0.0 });
            scratch.diag.push(-(inv_front + inv_rear));
            scratch
                .upper
                .push(if j + 1 < couplers { inv_rear } else { 0.0 });
            scratch
                .rhs
                .push(scratch.net_force[j + 1] * inv_rear - scratch.net_force[j] * inv_front);
        }
        thomas_solve(scratch);

        let mut changed = false;
        for j in 0..couplers {
            if scratch.free[j] || cars[j].physics.coupler_slack_limit_m <= 0.0 {
                continue;
            }
            let tension = scratch.tension[j];
            let slack = cars[j].dynamics.coupler_slack_m;
            let stretched = slack > 0.0;
            if (stretched && tension < 0.0) || (!stretched && tension > 0.0) {
                scratch.free[j] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (j, car) in cars.iter_mut().enumerate() {
        car.dynamics.coupler_force_n = if j < couplers && !scratch.free[j] {
            -scratch.tension[j]
        } else {
            0.0
        };
    }
}
