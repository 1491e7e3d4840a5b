use std::path::PathBuf;

use bevy::prelude::*;
use simulation::train::TrainRoster;
use simulation::TickCounter;

use crate::brake_snapshot::{read_brake_snapshot, write_brake_snapshot};
use crate::save_error::SaveError;
use crate::session::{load_session, save_session};

// =============================================================================
// Events
// =============================================================================

#[derive(Event, Debug, Clone)]
pub struct SaveSessionEvent {
    pub path: PathBuf,
}

#[derive(Event, Debug, Clone)]
pub struct LoadSessionEvent {
    pub path: PathBuf,
}

#[derive(Event, Debug, Clone)]
pub struct SaveBrakeSnapshotEvent {
    pub path: PathBuf,
}

#[derive(Event, Debug, Clone)]
pub struct LoadBrakeSnapshotEvent {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOperation {
    SaveSession,
    LoadSession,
    SaveSnapshot,
    LoadSnapshot,
}

/// Result of one processed save/load request. `error` is `None` on success.
#[derive(Event, Debug, Clone)]
pub struct SaveOutcomeEvent {
    pub operation: SaveOperation,
    pub path: PathBuf,
    pub error: Option<String>,
}

impl SaveOutcomeEvent {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// File I/O for sessions and brake snapshots. Requests are handled between
/// fixed ticks, in `Update`, so a save never observes a half-stepped train.
pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveSessionEvent>()
            .add_event::<LoadSessionEvent>()
            .add_event::<SaveBrakeSnapshotEvent>()
            .add_event::<LoadBrakeSnapshotEvent>()
            .add_event::<SaveOutcomeEvent>()
            .add_systems(Update, process_save_requests);
    }
}

fn drain<E: Event>(world: &mut World) -> Vec<E> {
    world
        .get_resource_mut::<Events<E>>()
        .map(|mut events| events.drain().collect())
        .unwrap_or_default()
}

fn report(world: &mut World, operation: SaveOperation, path: PathBuf, result: Result<String, SaveError>) {
    let error = match result {
        Ok(summary) => {
            info!("{operation:?} {}: {summary}", path.display());
            None
        }
        Err(e) => {
            error!("{operation:?} {} failed: {e}", path.display());
            Some(e.to_string())
        }
    };
    world.send_event(SaveOutcomeEvent {
        operation,
        path,
        error,
    });
}

/// Exclusive system: saves run before loads so "save then load" in one frame
/// reads back what was just written.
pub(crate) fn process_save_requests(world: &mut World) {
    for SaveSessionEvent { path } in drain::<SaveSessionEvent>(world) {
        let result = save_session(world, &path).map(|n| format!("wrote {n} bytes"));
        report(world, SaveOperation::SaveSession, path, result);
    }

    for SaveBrakeSnapshotEvent { path } in drain::<SaveBrakeSnapshotEvent>(world) {
        let tick = world.get_resource::<TickCounter>().map_or(0, |t| t.0);
        let result = match world.get_resource::<TrainRoster>() {
            Some(roster) => write_brake_snapshot(&path, roster, tick),
            None => Ok(0),
        }
        .map(|n| format!("wrote {n} bytes at tick {tick}"));
        report(world, SaveOperation::SaveSnapshot, path, result);
    }

    for LoadSessionEvent { path } in drain::<LoadSessionEvent>(world) {
        let result = load_session(world, &path).map(|tick| format!("restored tick {tick}"));
        report(world, SaveOperation::LoadSession, path, result);
    }

    for LoadBrakeSnapshotEvent { path } in drain::<LoadBrakeSnapshotEvent>(world) {
        let result = match world.get_resource_mut::<TrainRoster>() {
            Some(mut roster) => read_brake_snapshot(&path, &mut roster),
            None => Ok(0),
        }
        .map(|tick| format!("restored brakes from tick {tick}"));
        report(world, SaveOperation::LoadSnapshot, path, result);
    }
}
