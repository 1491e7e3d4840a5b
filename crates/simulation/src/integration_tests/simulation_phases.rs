use crate::brakes::ValveState;
use crate::test_harness::TestTrain;
use crate::train::{BrakeCommandKind, ControllerPosition};

// ---------------------------------------------------------------------------
// SimulationSet phase ordering
// ---------------------------------------------------------------------------

/// If the set chain were broken (missing configure_sets, a cycle) Bevy would
/// panic building the schedule or the systems would not run.
#[test]
fn test_simulation_set_phases_configured() {
    let (mut sim, _) = TestTrain::with_freight(3);
    sim.tick(5);
    assert_eq!(sim.tick_count(), 5);
}

#[test]
fn test_one_update_runs_exactly_one_fixed_tick() {
    let mut sim = TestTrain::new();
    for expected in 1..=10 {
        sim.tick(1);
        assert_eq!(sim.tick_count(), expected);
    }
}

#[test]
fn test_command_takes_effect_in_the_same_tick() {
    let (mut sim, id) = TestTrain::with_freight(2);
    sim.send(
        id,
        BrakeCommandKind::SetController {
            position: ControllerPosition::Emergency,
            equalizing_reservoir_psi: 0.0,
        },
    );
    sim.tick(1);

    let train = sim.train(id);
    assert!(train.controller.is_emergency());
    // PreSim applied the command before Simulation vented the pipe.
    assert!(train.cars[0].brake.brake_pipe_psi < 90.0);
}

#[test]
fn test_command_for_unknown_train_is_ignored() {
    let (mut sim, id) = TestTrain::with_freight(2);
    sim.send(id + 40, BrakeCommandKind::SetBailOff { on: true });
    sim.tick(3);
    assert!(!sim.train(id).controller.bail_off);
    assert_eq!(sim.train(id).cars[1].brake.triple_valve, ValveState::Release);
}

#[test]
fn test_rejected_command_leaves_train_unchanged() {
    let (mut sim, id) = TestTrain::with_freight(2);
    sim.send(
        id,
        BrakeCommandKind::SetPower {
            car_index: 2,
            on: false,
        },
    );
    sim.tick(1);
    let train = sim.train(id);
    assert!(train.cars[0].locomotive.as_ref().is_some_and(|l| l.power_on));
    assert!((train.cars[2].brake.brake_pipe_psi - 90.0).abs() < 1e-3);
}
