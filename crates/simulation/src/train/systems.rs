use bevy::prelude::*;

use crate::brake_settings::{BrakeSimSettings, TickContext};
use crate::events::{BrakeSoundEvent, SignalSink};
use crate::SimulationSet;

use super::commands::BrakeCommand;
use super::propagation::{step_train_brakes, PropagationScratch};
use super::types::TrainRoster;

// =============================================================================
// Systems
// =============================================================================

/// Apply queued brake commands before any pressure moves this tick.
pub fn apply_brake_commands(
    mut commands: EventReader<BrakeCommand>,
    mut roster: ResMut<TrainRoster>,
) {
    for command in commands.read() {
        let Some(train) = roster.get_mut(command.train) else {
            warn!("BrakeCommand for unknown train {}", command.train);
            continue;
        };
        if let Err(e) = train.apply_command(command.kind) {
            warn!(
                "BrakeCommand {:?} rejected for train {}: {}",
                command.kind, command.train, e
            );
        }
    }
}

/// Step every train's brakes by one fixed tick and publish the signals they
/// raised.
pub fn update_train_brakes(
    time: Res<Time>,
    settings: Res<BrakeSimSettings>,
    mut roster: ResMut<TrainRoster>,
    mut sounds: EventWriter<BrakeSoundEvent>,
    mut scratch: Local<PropagationScratch>,
    mut signals: Local<SignalSink>,
    mut was_clamped: Local<bool>,
) {
    let raw = time.delta_secs();
    let ctx = TickContext::new(raw, &settings);
    let clamped = raw.is_finite() && raw > settings.max_tick_seconds;
    if clamped && !*was_clamped {
        warn!(
            "Brake tick of {:.3}s clamped to {:.3}s",
            raw, settings.max_tick_seconds
        );
    }
    *was_clamped = clamped;

    for train in roster.trains.iter_mut() {
        step_train_brakes(train, &ctx, &mut scratch, &mut signals);
        let id = train.id;
        for record in signals.drain() {
            sounds.send(BrakeSoundEvent {
                train: id,
                car_index: record.car_index,
                signal: record.signal,
            });
        }
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct TrainBrakesPlugin;

impl Plugin for TrainBrakesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<BrakeCommand>()
            .add_event::<BrakeSoundEvent>()
            .init_resource::<TrainRoster>();

        // Register for save/load via the SaveableRegistry.
        app.init_resource::<crate::SaveableRegistry>();
        app.world_mut()
            .resource_mut::<crate::SaveableRegistry>()
            .register::<TrainRoster>();

        app.add_systems(
            FixedUpdate,
            apply_brake_commands.in_set(SimulationSet::PreSim),
        )
        .add_systems(
            FixedUpdate,
            update_train_brakes.in_set(SimulationSet::Simulation),
        );
    }
}
