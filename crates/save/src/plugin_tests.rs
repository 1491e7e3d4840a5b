//! End-to-end tests of `SavePlugin` driving a headless simulation.

use std::path::PathBuf;

use bevy::prelude::*;
use simulation::brakes::ValveState;
use simulation::test_harness::TestTrain;
use simulation::train::{BrakeCommandKind, ControllerPosition, TrainId};

use crate::{
    LoadBrakeSnapshotEvent, LoadSessionEvent, SaveBrakeSnapshotEvent, SaveOperation,
    SaveOutcomeEvent, SavePlugin, SaveSessionEvent,
};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("railbrake_plugin_{}", std::process::id()))
        .join(name)
}

fn sim_with_save(wagons: usize) -> (TestTrain, TrainId) {
    let (mut sim, id) = TestTrain::with_freight(wagons);
    sim.app_mut().add_plugins(SavePlugin);
    (sim, id)
}

fn emergency() -> BrakeCommandKind {
    BrakeCommandKind::SetController {
        position: ControllerPosition::Emergency,
        equalizing_reservoir_psi: 0.0,
    }
}

fn request<E: Event>(sim: &mut TestTrain, event: E) -> Vec<SaveOutcomeEvent> {
    sim.world_mut().send_event(event);
    sim.tick(1);
    sim.world_mut()
        .resource::<Events<SaveOutcomeEvent>>()
        .iter_current_update_events()
        .cloned()
        .collect()
}

#[test]
fn test_session_save_and_load_through_events() {
    let path = scratch_path("session.rbrk");
    let (mut sim, id) = sim_with_save(3);
    sim.run_seconds(1.0);

    let outcomes = request(&mut sim, SaveSessionEvent { path: path.clone() });
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].operation, SaveOperation::SaveSession);
    assert!(outcomes[0].succeeded(), "{:?}", outcomes[0].error);
    let saved = sim.train(id).clone();

    sim.send(id, emergency());
    sim.tick(30);
    assert_ne!(sim.train(id), &saved);

    let outcomes = request(&mut sim, LoadSessionEvent { path: path.clone() });
    assert!(outcomes[0].succeeded(), "{:?}", outcomes[0].error);
    // The load lands after this update's fixed tick, so the roster holds the
    // saved state exactly.
    assert_eq!(sim.train(id), &saved);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_brake_snapshot_rewinds_emergency() {
    let path = scratch_path("snapshot.rbrk");
    let (mut sim, id) = sim_with_save(4);
    sim.run_seconds(1.0);

    let outcomes = request(&mut sim, SaveBrakeSnapshotEvent { path: path.clone() });
    assert!(outcomes[0].succeeded(), "{:?}", outcomes[0].error);

    sim.send(id, emergency());
    sim.tick(60);
    assert!(sim
        .train(id)
        .cars
        .iter()
        .any(|c| c.brake.triple_valve == ValveState::Emergency));

    let outcomes = request(&mut sim, LoadBrakeSnapshotEvent { path: path.clone() });
    assert_eq!(outcomes[0].operation, SaveOperation::LoadSnapshot);
    assert!(outcomes[0].succeeded(), "{:?}", outcomes[0].error);
    assert!(sim
        .train(id)
        .cars
        .iter()
        .all(|c| c.brake.triple_valve != ValveState::Emergency));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_missing_file_reports_error_and_keeps_state() {
    let path = scratch_path("does_not_exist.rbrk");
    let _ = std::fs::remove_file(&path);
    let (mut sim, id) = sim_with_save(2);
    sim.tick(5);

    let outcomes = request(&mut sim, LoadSessionEvent { path });
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].succeeded());
    assert!(outcomes[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("I/O error")));
    assert_eq!(sim.roster().len(), 1);
    assert_eq!(sim.train(id).cars.len(), 3);
}
