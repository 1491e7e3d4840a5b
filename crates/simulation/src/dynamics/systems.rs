use bevy::prelude::*;

use crate::brake_settings::{BrakeSimSettings, TickContext};
use crate::events::DerailmentWarning;
use crate::train::{update_train_brakes, Train, TrainRoster};
use crate::SimulationSet;

use super::coupler::{integrate_slack, solve_coupler_forces, CouplerScratch};
use super::curve::update_curve_force;
use super::derailment::{update_derailment_risk, DerailmentTransition};

/// Curve forces, coupler slack and forces, then derailment risk, for one
/// train. Runs after the brakes so retard forces are current.
pub fn step_train_dynamics(
    train: &mut Train,
    ctx: &TickContext<'_>,
    scratch: &mut CouplerScratch,
    raised: &mut Vec<DerailmentTransition>,
) {
    for car in train.cars.iter_mut() {
        update_curve_force(car, ctx.settings, ctx.elapsed_s);
    }
    integrate_slack(&mut train.cars, ctx.elapsed_s);
    solve_coupler_forces(&mut train.cars, scratch);
    update_derailment_risk(&mut train.cars, raised);
}

// =============================================================================
// Systems
// =============================================================================

pub fn update_train_dynamics(
    time: Res<Time>,
    settings: Res<BrakeSimSettings>,
    mut roster: ResMut<TrainRoster>,
    mut warnings: EventWriter<DerailmentWarning>,
    mut scratch: Local<CouplerScratch>,
    mut raised: Local<Vec<DerailmentTransition>>,
) {
    let ctx = TickContext::new(time.delta_secs(), &settings);
    for train in roster.trains.iter_mut() {
        step_train_dynamics(train, &ctx, &mut scratch, &mut raised);
        for transition in raised.drain(..) {
            warnings.send(DerailmentWarning {
                train: train.id,
                car_index: transition.car_index,
                force_ratio: transition.force_ratio,
                limit: transition.limit,
            });
        }
    }
}

/// Runs in `PostSim` so every warning raised this tick is logged once.
pub fn log_derailment_warnings(mut warnings: EventReader<DerailmentWarning>) {
    for w in warnings.read() {
        warn!(
            "Train {} car {}: derailment expected (L/V {:.2} > {:.2})",
            w.train, w.car_index, w.force_ratio, w.limit
        );
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct TrainDynamicsPlugin;

impl Plugin for TrainDynamicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DerailmentWarning>().add_systems(
            FixedUpdate,
            (
                update_train_dynamics
                    .after(update_train_brakes)
                    .in_set(SimulationSet::Simulation),
                log_derailment_warnings.in_set(SimulationSet::PostSim),
            ),
        );
    }
}
