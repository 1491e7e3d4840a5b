use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::brake_settings::BrakeSimSettings;
use crate::test_harness::TestTrain;
use crate::train::{BrakeCommandKind, ControllerPosition, TrainRoster};
use crate::SaveableRegistry;

fn save_extensions(sim: &mut TestTrain) -> BTreeMap<String, Vec<u8>> {
    sim.world_mut()
        .resource_scope(|world, registry: Mut<SaveableRegistry>| registry.save_all(world))
}

fn load_extensions(sim: &mut TestTrain, extensions: &BTreeMap<String, Vec<u8>>) {
    sim.world_mut()
        .resource_scope(|world, registry: Mut<SaveableRegistry>| {
            registry.load_all(world, extensions)
        });
}

#[test]
fn test_plugins_register_their_saveables() {
    let sim = TestTrain::new();
    let keys: Vec<_> = sim.resource::<SaveableRegistry>().keys().collect();
    assert!(keys.contains(&"brake_settings"));
    assert!(keys.contains(&"train_roster"));
}

#[test]
fn test_empty_session_saves_nothing() {
    let mut sim = TestTrain::new();
    sim.tick(3);
    assert!(save_extensions(&mut sim).is_empty());
}

#[test]
fn test_roster_and_settings_survive_a_session_round_trip() {
    let (mut sim, id) = TestTrain::with_freight(4);
    sim.world_mut().resource_mut::<BrakeSimSettings>().max_substeps = 256;
    sim.send(
        id,
        BrakeCommandKind::SetController {
            position: ControllerPosition::Apply,
            equalizing_reservoir_psi: 75.0,
        },
    );
    sim.run_seconds(5.0);

    let extensions = save_extensions(&mut sim);
    assert!(extensions.contains_key("train_roster"));
    assert!(extensions.contains_key("brake_settings"));

    let mut restored = TestTrain::new();
    load_extensions(&mut restored, &extensions);
    assert_eq!(restored.roster(), sim.roster());
    assert_eq!(restored.resource::<BrakeSimSettings>().max_substeps, 256);

    // Both copies keep evolving identically.
    sim.tick(30);
    restored.tick(30);
    assert_eq!(restored.train(id), sim.train(id));
}

#[test]
fn test_corrupt_roster_bytes_fall_back_to_empty() {
    let (mut sim, _) = TestTrain::with_freight(2);
    let mut extensions = BTreeMap::new();
    extensions.insert("train_roster".to_string(), vec![0xFF; 3]);
    load_extensions(&mut sim, &extensions);
    assert!(sim.resource::<TrainRoster>().is_empty());
}

#[test]
fn test_reset_clears_the_roster() {
    let (mut sim, _) = TestTrain::with_freight(2);
    sim.world_mut()
        .resource_scope(|world, registry: Mut<SaveableRegistry>| registry.reset_all(world));
    assert!(sim.roster().is_empty());
    assert_eq!(*sim.resource::<BrakeSimSettings>(), BrakeSimSettings::default());
}
