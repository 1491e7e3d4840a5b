use crate::test_harness::TestTrain;

/// Pull hard enough on a tight curve that the wagon's L/V ratio passes the
/// Nadal limit while the heavier locomotive stays below "possible".
fn heavy_pull_on_curve(sim: &mut TestTrain, id: crate::train::TrainId, radius_m: f32) {
    sim.with_train_mut(id, |train| {
        for car in &mut train.cars {
            car.dynamics.curve_radius_m = radius_m;
        }
        train.cars[0].dynamics.coupler_slack_m = train.cars[0].physics.coupler_slack_limit_m;
        train.cars[0].dynamics.motive_force_n = 1.2e7;
    });
}

#[test]
fn test_derailment_warning_raised_once_per_transition() {
    let (mut sim, id) = TestTrain::with_freight(1);
    heavy_pull_on_curve(&mut sim, id, 100.0);

    let warnings = sim.tick_collecting_warnings(10);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(warnings[0].train, id);
    assert_eq!(warnings[0].car_index, 1);
    assert!(warnings[0].force_ratio > warnings[0].limit);

    let train = sim.train(id);
    assert!(train.cars[1].dynamics.derail_expected);
    assert!(!train.cars[0].dynamics.derail_possible);
    assert!(train.cars[0].dynamics.coupler_force_n < 0.0, "coupler should be in tension");
}

#[test]
fn test_straight_track_clears_flags_and_rearms_warning() {
    let (mut sim, id) = TestTrain::with_freight(1);
    heavy_pull_on_curve(&mut sim, id, 100.0);
    sim.tick(2);

    sim.with_train_mut(id, |train| {
        for car in &mut train.cars {
            car.dynamics.curve_radius_m = 0.0;
        }
    });
    sim.tick(1);
    assert!(sim
        .train(id)
        .cars
        .iter()
        .all(|c| !c.dynamics.derail_expected && !c.dynamics.derail_possible));

    heavy_pull_on_curve(&mut sim, id, 100.0);
    assert_eq!(sim.tick_collecting_warnings(1).len(), 1);
}

#[test]
fn test_gentle_curve_raises_nothing() {
    let (mut sim, id) = TestTrain::with_freight(1);
    heavy_pull_on_curve(&mut sim, id, 2000.0);
    assert!(sim.tick_collecting_warnings(10).is_empty());
}
