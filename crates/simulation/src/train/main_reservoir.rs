//! Main reservoir pipe pooling and the engine brake line.

use crate::brakes::ValveState;

use super::propagation::brake_pipe_linked;
use super::types::{RailCar, Train};

fn carries_second_pipe(car: &RailCar) -> bool {
    car.is_locomotive() || car.brake.capabilities().two_pipes
}

fn second_pipe_linked(front: &RailCar, rear: &RailCar) -> bool {
    carries_second_pipe(front) && carries_second_pipe(rear) && brake_pipe_linked(front, rear)
}

/// Contiguous run of cars joined by the main reservoir pipe around the lead.
pub fn main_reservoir_span(train: &Train) -> Option<(usize, usize)> {
    let lead = train.lead_locomotive?;
    let cars = &train.cars;
    if !cars.get(lead)?.is_locomotive() {
        return None;
    }
    let mut first = lead;
    while first > 0 && second_pipe_linked(&cars[first - 1], &cars[first]) {
        first -= 1;
    }
    let mut last = lead;
    while last + 1 < cars.len() && second_pipe_linked(&cars[last], &cars[last + 1]) {
        last += 1;
    }
    Some((first, last))
}

/// Whether the span's outer cocks face a parted hose or the end of the train.
fn span_vents(cars: &[RailCar], first: usize, last: usize) -> bool {
    let front = &cars[first].brake;
    let front_open = front.angle_cock_a_open && !front.front_hose_connected;
    let rear_open = cars[last].brake.angle_cock_b_open
        && cars
            .get(last + 1)
            .is_none_or(|next| !next.brake.front_hose_connected);
    front_open || rear_open
}

/// Equalize every main reservoir and second pipe in the lead's span to their
/// volume-weighted mean. Outside the span a locomotive's second pipe reads
/// its own reservoir and other cars read zero.
pub(crate) fn pool_main_reservoirs(train: &mut Train) {
    let span = main_reservoir_span(train);
    let cars = &mut train.cars;

    if let Some((first, last)) = span {
        let pooled = if span_vents(cars, first, last) {
            0.0
        } else {
            let (mut air, mut volume) = (0.0_f32, 0.0_f32);
            for car in &cars[first..=last] {
                let pipe_volume = car.brake.brake_pipe_volume_m3();
                air += car.brake.second_pipe_psi * pipe_volume;
                volume += pipe_volume;
                if let Some(loco) = &car.locomotive {
                    air += loco.main_res_psi * loco.main_res_volume_m3();
                    volume += loco.main_res_volume_m3();
                }
            }
            if volume > 0.0 {
                (air / volume).max(0.0)
            } else {
                0.0
            }
        };
        for car in &mut cars[first..=last] {
            car.brake.second_pipe_psi = pooled;
            if let Some(loco) = car.locomotive.as_mut() {
                if pooled > 0.0 {
                    loco.main_res_psi = pooled;
                }
            }
        }
    }

    for (index, car) in cars.iter_mut().enumerate() {
        if span.is_some_and(|(first, last)| (first..=last).contains(&index)) {
            continue;
        }
        car.brake.second_pipe_psi = car.locomotive.as_ref().map_or(0.0, |loco| loco.main_res_psi);
    }
}

/// Drive the engine brake line of every locomotive in the lead span toward
/// the commanded pressure. Returns the combined line state: Apply if any
/// line rose, else Release if any fell, else Lap.
pub(crate) fn drive_engine_brake_line(train: &mut Train, dt: f32) -> ValveState {
    let target = train.controller.engine_brake_line_psi.max(0.0);
    let span = train.lead_span();
    let Some((first, last)) = span else {
        for car in &mut train.cars {
            car.brake.engine_line_psi = 0.0;
        }
        return ValveState::Lap;
    };
    let Some(lead) = train.lead_locomotive else {
        return ValveState::Lap;
    };
    let sharing = (last - first + 1) as f32;

    let mut state = ValveState::Lap;
    let mut consumed = 0.0_f32;
    let supply = train.cars[lead]
        .locomotive
        .as_ref()
        .map_or(0.0, |loco| loco.main_res_psi);

    for (index, car) in train.cars.iter_mut().enumerate() {
        if index < first || index > last {
            car.brake.engine_line_psi = 0.0;
            continue;
        }
        let Some(loco) = car.locomotive.as_ref() else {
            continue;
        };
        let brake = &mut car.brake;
        let line = brake.engine_line_psi;
        if line < target && line < supply {
            let rate = loco.params.engine_brake_apply_rate_psi_s / sharing;
            let dp = (rate * dt).min(target - line).min(supply - line).max(0.0);
            if dp > 0.0 {
                brake.engine_line_psi += dp;
                consumed += dp * brake.cylinder_volume_m3();
                state = ValveState::Apply;
            }
        } else if line > target {
            let rate = loco.params.engine_brake_release_rate_psi_s / sharing;
            let dp = (rate * dt).min(line - target);
            if dp > 0.0 {
                brake.engine_line_psi -= dp;
                if state != ValveState::Apply {
                    state = ValveState::Release;
                }
            }
        }
    }

    if consumed > 0.0 {
        if let Some(loco) = train.cars[lead].locomotive.as_mut() {
            loco.main_res_psi = (loco.main_res_psi - consumed / loco.main_res_volume_m3()).max(0.0);
        }
    }
    state
}
