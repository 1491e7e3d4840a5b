use crate::brakes::{CarBrakeParams, ValveState};
use crate::events::BrakeSignal;
use crate::test_harness::{freight_consist, locomotive, TestTrain};
use crate::train::{BrakeCommandKind, CarKind, CarPhysics, ControllerPosition, RailCar, Train};

fn controller(position: ControllerPosition, er_psi: f32) -> BrakeCommandKind {
    BrakeCommandKind::SetController {
        position,
        equalizing_reservoir_psi: er_psi,
    }
}

// ---------------------------------------------------------------------------
// Automatic brake
// ---------------------------------------------------------------------------

#[test]
fn test_service_application_settles_along_the_train() {
    let (mut sim, id) = TestTrain::with_freight(5);
    sim.send(id, controller(ControllerPosition::Apply, 70.0));
    sim.run_seconds(60.0);

    let train = sim.train(id);
    for car in &train.cars {
        assert!(
            (car.brake.brake_pipe_psi - 70.0).abs() < 1.0,
            "{} pipe {}",
            car.name,
            car.brake.brake_pipe_psi
        );
        assert_ne!(car.brake.triple_valve, ValveState::Emergency);
    }
    assert!(train.cars[5].brake.cylinder_psi() > 5.0);
}

#[test]
fn test_emergency_application_reaches_every_car() {
    let (mut sim, id) = TestTrain::with_freight(5);
    sim.send(id, controller(ControllerPosition::Emergency, 0.0));
    sim.run_seconds(10.0);

    for car in &sim.train(id).cars {
        assert!(car.brake.brake_pipe_psi < 1.0, "{}", car.brake.brake_pipe_psi);
        assert_eq!(car.brake.triple_valve, ValveState::Emergency);
        assert!(car.brake.cylinder_psi() > 0.0);
    }
}

#[test]
fn test_release_after_service_recharges_and_releases() {
    let (mut sim, id) = TestTrain::with_freight(5);
    sim.send(id, controller(ControllerPosition::Apply, 70.0));
    sim.run_seconds(40.0);
    let applied = sim.train(id).cars[5].brake.cylinder_psi();
    assert!(applied > 5.0);

    sim.send(id, controller(ControllerPosition::Release, 0.0));
    sim.run_seconds(60.0);
    let train = sim.train(id);
    assert!(train.cars[0].brake.brake_pipe_psi > 85.0);
    assert!(train.cars[5].brake.cylinder_psi() < applied / 2.0);
}

#[test]
fn test_trains_in_the_roster_are_independent() {
    let mut sim = TestTrain::new();
    let a = sim.add_train(freight_consist("a", 3));
    let b = sim.add_train(freight_consist("b", 3));
    sim.send(a, controller(ControllerPosition::Emergency, 0.0));
    sim.run_seconds(5.0);

    assert!(sim.train(a).cars[3].brake.brake_pipe_psi < 10.0);
    for car in &sim.train(b).cars {
        assert!((car.brake.brake_pipe_psi - 90.0).abs() < 1e-3);
        assert_eq!(car.brake.cylinder_psi(), 0.0);
    }
}

// ---------------------------------------------------------------------------
// Electro-pneumatic
// ---------------------------------------------------------------------------

#[test]
fn test_ep_demand_applies_without_touching_the_brake_pipe() {
    let mut cars = vec![locomotive("loco")];
    cars.extend((0..3).map(|i| {
        RailCar::wagon(
            format!("coach{i}"),
            CarKind::Passenger,
            CarPhysics::default(),
            CarBrakeParams::electro_pneumatic(),
        )
    }));
    let mut sim = TestTrain::new();
    let id = sim.add_train(Train::new("ep", cars));

    sim.send(id, BrakeCommandKind::SetEpDemand { demand: 0.5 });
    sim.run_seconds(60.0);
    let train = sim.train(id);
    for car in &train.cars[1..] {
        assert!(
            (car.brake.cylinder_psi() - 32.0).abs() < 0.5,
            "{} cyl {}",
            car.name,
            car.brake.cylinder_psi()
        );
        assert!(car.brake.brake_pipe_psi > 89.0);
    }

    sim.send(id, BrakeCommandKind::SetEpDemand { demand: -1.0 });
    sim.run_seconds(60.0);
    assert!(sim.train(id).cars[1..]
        .iter()
        .all(|c| c.brake.cylinder_psi() < 0.01));
}

// ---------------------------------------------------------------------------
// Sound events
// ---------------------------------------------------------------------------

#[test]
fn test_charged_train_at_rest_is_silent() {
    let (mut sim, _) = TestTrain::with_freight(3);
    assert!(sim.tick_collecting_sounds(60).is_empty());
}

#[test]
fn test_service_application_sounds_from_the_locomotive() {
    let (mut sim, id) = TestTrain::with_freight(3);
    sim.send(id, controller(ControllerPosition::Apply, 70.0));
    let sounds = sim.tick_collecting_sounds(90);

    assert!(sounds.iter().any(|e| e.train == id
        && e.car_index == 0
        && e.signal == BrakeSignal::BrakePipePressureDecrease));
    assert!(sounds.iter().all(|e| e.car_index == 0));
}

#[test]
fn test_engine_brake_command_signals_on_the_lead() {
    let (mut sim, id) = TestTrain::with_freight(2);
    sim.send(id, BrakeCommandKind::SetEngineBrake { line_psi: 30.0 });
    let sounds = sim.tick_collecting_sounds(1);
    assert!(sounds
        .iter()
        .any(|e| e.car_index == 0 && e.signal == BrakeSignal::EngineBrakePressureIncrease));
}
