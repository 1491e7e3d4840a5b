//! Brake pipe propagation along a train.
//!
//! Each tick is split into sub-steps short enough for the explicit diffusion
//! to stay monotone. Per sub-step, front to rear:
//!
//! 1. the lead car's pipe is charged from (or vented toward) the equalizing
//!    reservoir,
//! 2. pairwise transfers between linked cars are computed into a scratch
//!    buffer and then applied,
//! 3. open hose ends bleed to atmosphere,
//! 4. the main reservoir pipe is pooled and the engine brake line driven.
//!
//! Per-car valve updates run after all sub-steps, see [`step_train_brakes`].

use crate::brake_settings::TickContext;
use crate::brakes::{CarUpdateContext, ValveState};
use crate::config::MAX_PAIR_TRANSFER_FRACTION;
use crate::events::{BrakeSignal, SignalSink};

use super::controller::ControllerPosition;
use super::main_reservoir::{drive_engine_brake_line, pool_main_reservoirs};
use super::types::{RailCar, Train};

/// Reusable buffers for one train step. Keep one per system and reuse it
/// across trains and ticks.
#[derive(Debug, Default)]
pub struct PropagationScratch {
    pub(crate) deltas: Vec<f32>,
}

/// Sub-steps needed for `elapsed_s` at time factor `time_factor_s`: enough
/// that no pair exchanges more than half its difference per sub-step.
pub fn substep_count(elapsed_s: f32, time_factor_s: f32, max_substeps: u32) -> u32 {
    let max_substeps = max_substeps.max(1);
    if elapsed_s <= 0.0 || time_factor_s <= 0.0 {
        return 1;
    }
    let needed = (elapsed_s / (MAX_PAIR_TRANSFER_FRACTION * time_factor_s)).ceil();
    if needed >= max_substeps as f32 {
        max_substeps
    } else {
        (needed as u32).max(1)
    }
}

/// Whether the brake pipe of `front` is linked through to `rear`.
pub fn brake_pipe_linked(front: &RailCar, rear: &RailCar) -> bool {
    rear.brake.front_hose_connected && rear.brake.angle_cock_a_open && front.brake.angle_cock_b_open
}

/// Advance the brake pipe, main reservoir pipe and engine brake line of
/// `train` by one tick.
pub fn propagate_brake_pressures(
    train: &mut Train,
    ctx: &TickContext<'_>,
    scratch: &mut PropagationScratch,
    signals: &mut SignalSink,
) {
    if train.cars.is_empty() || ctx.elapsed_s <= 0.0 {
        return;
    }
    let time_factor_s =
        train.brake_pipe_time_factor_s(ctx.settings.fallback_brake_pipe_time_factor_s);
    let substeps = substep_count(ctx.elapsed_s, time_factor_s, ctx.settings.max_substeps);
    let dt = ctx.elapsed_s / substeps as f32;
    let fraction = (dt / time_factor_s).min(MAX_PAIR_TRANSFER_FRACTION);

    for _ in 0..substeps {
        charge_lead_brake_pipe(train, dt);
        diffuse_brake_pipe(&mut train.cars, fraction, scratch);
        vent_open_ends(&mut train.cars, fraction);
        pool_main_reservoirs(train);
        // A short change can start and finish inside one tick, so every
        // sub-step transition is signalled.
        let engine_state = drive_engine_brake_line(train, dt);
        if engine_state != train.engine_brake_state {
            if let Some(lead) = train.lead_locomotive {
                signals.emit(lead, engine_state_signal(engine_state));
            }
            train.engine_brake_state = engine_state;
        }
    }
}

fn engine_state_signal(state: ValveState) -> BrakeSignal {
    match state {
        ValveState::Apply | ValveState::Emergency => BrakeSignal::EngineBrakePressureIncrease,
        ValveState::Release => BrakeSignal::EngineBrakePressureDecrease,
        ValveState::Lap => BrakeSignal::EngineBrakePressureStoppedChanging,
    }
}

/// Leak, then charge from the main reservoir or vent toward the equalizing
/// reservoir. In Lap the pipe is isolated and only leaks; in Neutral the
/// brake valve is cut out entirely.
fn charge_lead_brake_pipe(train: &mut Train, dt: f32) {
    let Some(lead) = train.lead_locomotive else {
        return;
    };
    let controller = train.controller;
    let Some(car) = train.cars.get_mut(lead) else {
        return;
    };
    let pipe_volume = car.brake.brake_pipe_volume_m3();
    let Some(loco) = car.locomotive.as_mut() else {
        return;
    };
    let p = loco.params;
    let brake = &mut car.brake;

    if p.brake_pipe_leak_rate_psi_s > 0.0 {
        brake.brake_pipe_psi = (brake.brake_pipe_psi - p.brake_pipe_leak_rate_psi_s * dt).max(0.0);
    }

    match controller.position {
        ControllerPosition::Neutral | ControllerPosition::Lap => return,
        _ => {}
    }

    let target = controller.equalizing_reservoir_psi.max(0.0);
    if brake.brake_pipe_psi < target {
        let rate = if controller.position.is_quick_charge() {
            p.brake_pipe_quick_charging_rate_psi_s
        } else {
            p.brake_pipe_charging_rate_psi_s
        };
        let dp = (rate * dt)
            .min(target - brake.brake_pipe_psi)
            .min(loco.main_res_psi - brake.brake_pipe_psi)
            .max(0.0);
        brake.brake_pipe_psi += dp;
        loco.main_res_psi =
            (loco.main_res_psi - dp * pipe_volume / loco.main_res_volume_m3()).max(0.0);
    } else if brake.brake_pipe_psi > target {
        let time_factor = if controller.is_emergency() {
            p.brake_emergency_time_factor_s
        } else {
            p.brake_service_time_factor_s
        };
        let keep = if time_factor > 0.0 {
            (1.0 - dt / time_factor).clamp(0.05, 1.0)
        } else {
            0.05
        };
        brake.brake_pipe_psi = target + (brake.brake_pipe_psi - target) * keep;
    }
}

/// One Jacobi step of pairwise exchange. Transfers are computed from the
/// current pressures, then applied, so the result does not depend on the
/// order pairs are visited. Volume-weighted pressure is conserved.
fn diffuse_brake_pipe(cars: &mut [RailCar], fraction: f32, scratch: &mut PropagationScratch) {
    let deltas = &mut scratch.deltas;
    deltas.clear();
    deltas.resize(cars.len(), 0.0);

    for rear in 1..cars.len() {
        let front = rear - 1;
        if !brake_pipe_linked(&cars[front], &cars[rear]) {
            continue;
        }
        let (front_brake, rear_brake) = (&cars[front].brake, &cars[rear].brake);
        let v_front = front_brake.brake_pipe_volume_m3();
        let v_rear = rear_brake.brake_pipe_volume_m3();
        let total = v_front + v_rear;
        if total <= 0.0 {
            continue;
        }
        let transfer = fraction * (front_brake.brake_pipe_psi - rear_brake.brake_pipe_psi);
        deltas[front] -= transfer * v_rear / total;
        deltas[rear] += transfer * v_front / total;
    }

    for (car, delta) in cars.iter_mut().zip(deltas.iter()) {
        car.brake.brake_pipe_psi = (car.brake.brake_pipe_psi + delta).max(0.0);
    }
}

/// Bleed pipes whose open cock faces a parted hose or the end of the train.
fn vent_open_ends(cars: &mut [RailCar], fraction: f32) {
    let keep = (1.0 - fraction).max(0.0);
    let len = cars.len();
    for i in 0..len {
        let rear_open = cars[i].brake.angle_cock_b_open
            && (i + 1 == len || !cars[i + 1].brake.front_hose_connected);
        let brake = &mut cars[i].brake;
        let front_open = brake.angle_cock_a_open && !brake.front_hose_connected;
        if front_open {
            brake.brake_pipe_psi *= keep;
        }
        if rear_open {
            brake.brake_pipe_psi *= keep;
        }
    }
}

/// Step one train: pipe propagation, then every car's valves front to rear,
/// then the compressors.
pub fn step_train_brakes(
    train: &mut Train,
    ctx: &TickContext<'_>,
    scratch: &mut PropagationScratch,
    signals: &mut SignalSink,
) {
    if train.cars.is_empty() || ctx.elapsed_s <= 0.0 {
        return;
    }
    propagate_brake_pressures(train, ctx, scratch, signals);

    let ep_demand = train.controller.ep_demand;
    let bail_off = train.controller.bail_off;
    for (index, car) in train.cars.iter_mut().enumerate() {
        let powered = car.locomotive.as_ref().is_some_and(|loco| loco.power_on);
        let car_ctx = CarUpdateContext {
            car_index: index,
            ep_demand,
            bail_off: bail_off && powered,
            track_pressure_changes: car.is_locomotive(),
            sound_trigger_interval_s: ctx.settings.sound_trigger_interval_s,
        };
        car.brake.update(ctx.elapsed_s, &car_ctx, signals);
        if let Some(loco) = car.locomotive.as_mut() {
            loco.update_compressor(ctx.elapsed_s, index, signals);
        }
    }
}
