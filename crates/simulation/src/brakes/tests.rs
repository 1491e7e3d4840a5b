//! Tests for the per-car air brake.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::events::SignalSink;

const DT: f32 = 1.0 / 30.0;

fn charged(params: CarBrakeParams, full_service_psi: f32) -> AirBrake {
    let mut brake = AirBrake::new(params, 15.0);
    brake.initialize(&BrakeInit {
        brake_pipe_psi: 90.0,
        second_pipe_psi: 140.0,
        max_pressure_psi: 90.0,
        full_service_psi,
        handbrake_on: false,
        immediate_release: true,
    });
    brake
}

/// Step `seconds` with the brake pipe pinned to `pipe_psi`, as if fed by an
/// unlimited supply.
fn run_with_pipe(brake: &mut AirBrake, pipe_psi: f32, seconds: f32, ctx: &CarUpdateContext) {
    let mut sink = SignalSink::default();
    let steps = (seconds / DT).round() as usize;
    for _ in 0..steps {
        brake.brake_pipe_psi = pipe_psi;
        brake.update(DT, ctx, &mut sink);
    }
}

fn inputs(pipe: f32, aux: f32, reference: f32, full_service: f32) -> ValveInputs {
    ValveInputs {
        brake_pipe_psi: pipe,
        aux_res_psi: aux,
        reference_psi: reference,
        full_service_psi: full_service,
    }
}

// -------------------------------------------------------------------------
// Triple valve transitions
// -------------------------------------------------------------------------

#[test]
fn test_pipe_below_full_service_goes_to_emergency() {
    for state in [
        ValveState::Lap,
        ValveState::Apply,
        ValveState::Release,
        ValveState::Emergency,
    ] {
        let next = next_triple_valve_state(state, &inputs(47.9, 64.0, 64.0, 50.0));
        assert_eq!(next, ValveState::Emergency, "from {state:?}");
    }
}

#[test]
fn test_pipe_drop_from_release_applies() {
    let next = next_triple_valve_state(ValveState::Release, &inputs(62.0, 64.0, 64.0, 50.0));
    assert_eq!(next, ValveState::Apply);
}

#[test]
fn test_pipe_recovery_from_apply_laps() {
    let next = next_triple_valve_state(ValveState::Apply, &inputs(64.5, 64.0, 64.0, 50.0));
    assert_eq!(next, ValveState::Lap);
}

#[test]
fn test_equal_pressures_keep_current_state() {
    let equal = inputs(64.0, 64.0, 64.0, 50.0);
    assert_eq!(
        next_triple_valve_state(ValveState::Apply, &equal),
        ValveState::Apply
    );
    assert_eq!(next_triple_valve_state(ValveState::Lap, &equal), ValveState::Lap);
    assert_eq!(
        next_triple_valve_state(ValveState::Emergency, &equal),
        ValveState::Emergency
    );
}

#[test]
fn test_pipe_above_aux_stays_in_release() {
    let next = next_triple_valve_state(ValveState::Release, &inputs(66.0, 64.0, 64.0, 50.0));
    assert_eq!(next, ValveState::Release);
}

#[test]
fn test_pipe_rise_releases() {
    let next = next_triple_valve_state(ValveState::Lap, &inputs(65.5, 64.0, 64.0, 50.0));
    assert_eq!(next, ValveState::Release);
}

#[test]
fn test_emergency_releases_once_pipe_exceeds_aux() {
    let next = next_triple_valve_state(ValveState::Emergency, &inputs(64.2, 64.0, 64.0, 50.0));
    assert_eq!(next, ValveState::Release);
}

#[test]
fn test_quick_release_near_reference() {
    // Within the 1 psi sensitivity band, but above 97% of a charged reference.
    let next = next_triple_valve_state(ValveState::Apply, &inputs(88.0, 88.5, 90.0, 64.0));
    assert_eq!(next, ValveState::Release);
}

#[test]
fn test_quick_release_needs_charged_reference() {
    let next = next_triple_valve_state(ValveState::Lap, &inputs(68.0, 68.5, 69.0, 50.0));
    assert_eq!(next, ValveState::Lap);
}

// -------------------------------------------------------------------------
// Service and emergency applications
// -------------------------------------------------------------------------

#[test]
fn test_full_service_application_equalizes() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut brake, 50.0, 120.0, &CarUpdateContext::default());

    // Equilibrium of 90 psi aux into a 2.5:1 cylinder is ~64.3, clamped at 64.
    assert!((brake.cylinder_psi() - 64.0).abs() < 0.05, "cyl {}", brake.cylinder_psi());
    assert!((brake.aux_res_psi - 64.4).abs() < 0.1, "aux {}", brake.aux_res_psi);
    assert_eq!(brake.triple_valve, ValveState::Apply);
}

#[test]
fn test_service_application_respects_rate() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut brake, 50.0, 10.0, &CarUpdateContext::default());
    // 0.9 psi/s for ten seconds.
    assert!(brake.cylinder_psi() <= 9.0 + 1e-3);
    assert!(brake.cylinder_psi() > 8.0);
}

#[test]
fn test_aux_never_drawn_below_pipe() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut brake, 85.0, 60.0, &CarUpdateContext::default());
    assert!(brake.aux_res_psi >= 85.0 - 1e-3);
    // 5 psi reduction at 2.5:1.
    assert!((brake.cylinder_psi() - 12.5).abs() < 0.05);
}

#[test]
fn test_emergency_then_release() {
    let params = CarBrakeParams::default().with_emergency_reservoir();
    let mut brake = charged(params, 64.0);
    let ctx = CarUpdateContext::default();

    run_with_pipe(&mut brake, 0.0, 30.0, &ctx);
    assert_eq!(brake.triple_valve, ValveState::Emergency);
    assert!(brake.cylinder_psi() > 63.0);
    assert!(brake.emergency_res_psi < 85.0, "emergency reservoir should dump");
    assert!(brake.aux_res_psi > 70.0);

    run_with_pipe(&mut brake, 90.0, 120.0, &ctx);
    assert_eq!(brake.triple_valve, ValveState::Release);
    assert!(brake.cylinder_psi() < 0.01);
    assert!(brake.aux_res_psi > 88.0);
}

#[test]
fn test_release_stops_at_retainer_threshold() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut brake, 70.0, 60.0, &CarUpdateContext::default());
    assert!(brake.cylinder_psi() > 40.0);

    brake.set_retainer(RetainerSetting::HighPressure);
    run_with_pipe(&mut brake, 90.0, 200.0, &CarUpdateContext::default());
    assert!((brake.cylinder_psi() - 20.0).abs() < 1e-3);
}

// -------------------------------------------------------------------------
// Retainers
// -------------------------------------------------------------------------

#[test]
fn test_retainer_table() {
    let exhaust = retainer_effect(RetainerSetting::Exhaust, 4, 1.86);
    assert_eq!(exhaust.threshold_psi, 0.0);
    assert_eq!(exhaust.release_rate_psi_s, 1.86);

    let high = retainer_effect(RetainerSetting::HighPressure, 4, 1.86);
    assert_eq!(high.threshold_psi, 20.0);
    assert!((high.release_rate_psi_s - 30.0 / 90.0).abs() < 1e-6);

    let low = retainer_effect(RetainerSetting::LowPressure, 4, 1.86);
    assert_eq!(low.threshold_psi, 10.0);
    assert!((low.release_rate_psi_s - 40.0 / 60.0).abs() < 1e-6);

    let slow = retainer_effect(RetainerSetting::SlowDirect, 4, 1.86);
    assert_eq!(slow.threshold_psi, 0.0);
    assert!((slow.release_rate_psi_s - 40.0 / 86.0).abs() < 1e-6);
}

#[test]
fn test_low_pressure_retainer_falls_back_on_three_position_cars() {
    assert_eq!(
        retainer_effect(RetainerSetting::LowPressure, 3, 1.86),
        retainer_effect(RetainerSetting::HighPressure, 3, 1.86)
    );
}

#[test]
fn test_cars_without_retainers_ignore_high_pressure() {
    assert_eq!(
        retainer_effect(RetainerSetting::HighPressure, 0, 1.86),
        retainer_effect(RetainerSetting::Exhaust, 0, 1.86)
    );
}

// -------------------------------------------------------------------------
// Bleed-off, bail-off
// -------------------------------------------------------------------------

#[test]
fn test_bleed_off_empties_reservoirs_and_closes() {
    let params = CarBrakeParams::default().with_emergency_reservoir();
    let mut brake = charged(params, 64.0);
    brake.bleed_off_valve_open = true;

    let mut sink = SignalSink::default();
    let ctx = CarUpdateContext::default();
    let mut steps = 0;
    while brake.bleed_off_valve_open && steps < 200 * 30 {
        brake.update(DT, &ctx, &mut sink);
        steps += 1;
    }

    assert!(!brake.bleed_off_valve_open, "valve should close itself");
    assert!(brake.cylinder_psi() < NEAR_ZERO);
    assert!(brake.aux_res_psi < 0.1);
    assert!(brake.emergency_res_psi < NEAR_ZERO);
    // The brake pipe is not bled.
    assert!(brake.brake_pipe_psi > 85.0);
}

const NEAR_ZERO: f32 = 0.01;

#[test]
fn test_bail_off_releases_locomotive_cylinder() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut brake, 70.0, 60.0, &CarUpdateContext::default());
    let applied = brake.cylinder_psi();

    let bail = CarUpdateContext {
        bail_off: true,
        ..Default::default()
    };
    run_with_pipe(&mut brake, 70.0, 5.0, &bail);
    assert!(brake.bail_off_on);
    assert!(brake.cylinder_psi() < applied - 5.0);
}

// -------------------------------------------------------------------------
// Electro-pneumatic holding valve
// -------------------------------------------------------------------------

#[test]
fn test_holding_valve_follows_demand() {
    let mut brake = charged(CarBrakeParams::electro_pneumatic(), 64.0);

    assert_eq!(brake.set_holding_valve(EP_DEMAND_RELEASE), 0.0);
    assert_eq!(brake.holding_valve, ValveState::Release);

    assert_eq!(brake.set_holding_valve(EP_DEMAND_LAP), 0.0);
    assert_eq!(brake.holding_valve, ValveState::Lap);

    brake.auto_cyl_psi = 10.0;
    assert_eq!(brake.set_holding_valve(0.5), 32.0);
    assert_eq!(brake.holding_valve, ValveState::Lap);

    brake.auto_cyl_psi = 40.0;
    brake.set_holding_valve(0.5);
    assert_eq!(brake.holding_valve, ValveState::Release);
}

#[test]
fn test_ep_demand_fills_cylinder_from_second_pipe() {
    let mut brake = charged(CarBrakeParams::electro_pneumatic(), 64.0);
    let second_before = brake.second_pipe_psi;
    let apply = CarUpdateContext {
        ep_demand: 0.5,
        ..Default::default()
    };
    run_with_pipe(&mut brake, 90.0, 60.0, &apply);

    assert!((brake.cylinder_psi() - 32.0).abs() < 0.05, "cyl {}", brake.cylinder_psi());
    assert!(brake.second_pipe_psi < second_before);
    assert!(brake.second_pipe_psi > brake.cylinder_psi());

    let release = CarUpdateContext::default();
    run_with_pipe(&mut brake, 90.0, 60.0, &release);
    assert!(brake.cylinder_psi() < 0.01);
}

#[test]
fn test_lapped_holding_valve_blocks_pneumatic_release() {
    let mut brake = charged(CarBrakeParams::electro_pneumatic(), 50.0);
    brake.auto_cyl_psi = 20.0;
    let lap = CarUpdateContext {
        ep_demand: EP_DEMAND_LAP,
        ..Default::default()
    };
    run_with_pipe(&mut brake, 90.0, 10.0, &lap);
    assert!((brake.cylinder_psi() - 20.0).abs() < 1e-4);
}

// -------------------------------------------------------------------------
// Forces
// -------------------------------------------------------------------------

#[test]
fn test_brake_force_scales_with_cylinder() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    brake.auto_cyl_psi = 32.0;
    brake.refresh_cylinder();
    brake.update_brake_force();
    assert!((brake.brake_force_n - 44_500.0).abs() < 1.0);
}

#[test]
fn test_handbrake_floors_force() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    brake.set_handbrake(100.0);
    assert!((brake.brake_force_n - 30_000.0).abs() < 1.0);
    assert!(brake.is_braking());
}

#[test]
fn test_handbrake_ignored_without_capability() {
    let params = CarBrakeParams {
        handbrake: false,
        ..Default::default()
    };
    let mut brake = charged(params, 50.0);
    brake.set_handbrake(100.0);
    assert_eq!(brake.handbrake_percent, 0.0);
}

#[test]
fn test_stuck_brakes_hold_full_force() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    brake.brakes_stuck = true;
    brake.update_brake_force();
    assert_eq!(brake.brake_force_n, 89e3);
}

#[test]
fn test_cylinder_is_max_of_auto_and_engine_line() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    brake.auto_cyl_psi = 12.0;
    brake.engine_line_psi = 30.0;
    brake.refresh_cylinder();
    assert_eq!(brake.cylinder_psi(), 30.0);
    assert_eq!(brake.train_brake_cylinder_psi(), 12.0);
}

// -------------------------------------------------------------------------
// Geometry and degenerate input
// -------------------------------------------------------------------------

#[test]
fn test_pipe_volume_has_length_floor() {
    assert_eq!(brake_pipe_volume_m3(0.0), brake_pipe_volume_m3(4.0));
    assert_eq!(brake_pipe_volume_m3(f32::NAN), brake_pipe_volume_m3(0.0));
    assert!(brake_pipe_volume_m3(20.0) > brake_pipe_volume_m3(10.0));
}

#[test]
fn test_zero_length_car_stays_finite() {
    let mut brake = AirBrake::new(CarBrakeParams::default(), 0.0);
    brake.initialize(&BrakeInit {
        brake_pipe_psi: 90.0,
        second_pipe_psi: 0.0,
        max_pressure_psi: 90.0,
        full_service_psi: 64.0,
        handbrake_on: false,
        immediate_release: true,
    });
    assert!(brake.aux_brake_line_volume_ratio().is_finite());
    run_with_pipe(&mut brake, 70.0, 30.0, &CarUpdateContext::default());
    assert!(brake.pressures().iter().all(|p| p.is_finite() && *p >= 0.0));
}

#[test]
fn test_no_emergency_volume_uses_default_line_ratio() {
    let params = CarBrakeParams {
        emergency_res_volume_m3: 0.0,
        ..Default::default()
    };
    let brake = AirBrake::new(params, 15.0);
    assert_eq!(brake.aux_brake_line_volume_ratio(), 3.1);
}

#[test]
fn test_sanitize_replaces_bad_ratios() {
    let mut params = CarBrakeParams {
        aux_cyl_volume_ratio: 0.0,
        max_release_rate_psi_s: -1.0,
        ..Default::default()
    };
    let replaced = params.sanitize();
    assert_eq!(replaced, vec!["aux_cyl_volume_ratio", "max_release_rate_psi_s"]);
    assert_eq!(params.aux_cyl_volume_ratio, 2.5);
}

#[test]
fn test_zero_elapsed_changes_no_pressure() {
    let mut brake = charged(CarBrakeParams::default(), 50.0);
    brake.brake_pipe_psi = 80.0;
    let before = brake.pressures();
    brake.update(0.0, &CarUpdateContext::default(), &mut SignalSink::default());
    assert_eq!(brake.pressures(), before);
}

#[test]
fn test_random_pipe_history_keeps_pressures_non_negative() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xB2A4E);
    for params in [
        CarBrakeParams::single_pipe().with_emergency_reservoir(),
        CarBrakeParams::twin_pipe(),
        CarBrakeParams::electro_pneumatic(),
    ] {
        let mut brake = charged(params, 64.0);
        let mut sink = SignalSink::default();
        for _ in 0..3000 {
            if rng.gen_bool(0.05) {
                brake.brake_pipe_psi = rng.gen_range(0.0..110.0);
            }
            if rng.gen_bool(0.01) {
                brake.bleed_off_valve_open = true;
            }
            let ctx = CarUpdateContext {
                ep_demand: rng.gen_range(-1.0..1.0),
                bail_off: rng.gen_bool(0.1),
                ..Default::default()
            };
            brake.update(rng.gen_range(0.0..0.25), &ctx, &mut sink);
            assert!(
                brake.pressures().iter().all(|p| p.is_finite() && *p >= 0.0),
                "negative pressure: {:?}",
                brake.pressures()
            );
            assert!(brake.cylinder_psi() >= brake.train_brake_cylinder_psi());
        }
    }
}

// -------------------------------------------------------------------------
// Persistence
// -------------------------------------------------------------------------

#[test]
fn test_saved_record_has_fixed_length() {
    let brake = charged(CarBrakeParams::default(), 50.0);
    let mut out = Vec::new();
    brake.save_state(&mut out);
    assert_eq!(out.len(), CAR_STATE_LEN);
}

#[test]
fn test_restore_reproduces_saved_state() {
    let mut brake = charged(CarBrakeParams::twin_pipe().with_emergency_reservoir(), 64.0);
    run_with_pipe(&mut brake, 75.0, 20.0, &CarUpdateContext::default());
    brake.set_retainer(RetainerSetting::SlowDirect);
    brake.angle_cock_b_open = false;
    brake.engine_line_psi = 45.0;
    brake.refresh_cylinder();

    let mut out = Vec::new();
    brake.save_state(&mut out);

    let mut restored = charged(CarBrakeParams::twin_pipe().with_emergency_reservoir(), 64.0);
    let mut reader = StateReader::new(&out);
    restored.restore_state(&mut reader).expect("restore");
    reader.finish().expect("no trailing bytes");

    assert_eq!(restored.pressures(), brake.pressures());
    assert_eq!(restored.triple_valve, brake.triple_valve);
    assert_eq!(restored.retainer, RetainerSetting::SlowDirect);
    assert!(!restored.angle_cock_b_open);
    assert_eq!(restored.cylinder_psi(), 45.0);
}

#[test]
fn test_restore_restarts_pressure_sampling_from_restored_state() {
    let tracked = CarUpdateContext {
        track_pressure_changes: true,
        ..Default::default()
    };
    let mut saved = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut saved, 90.0, 5.0, &tracked);
    let mut out = Vec::new();
    saved.save_state(&mut out);

    let mut brake = charged(CarBrakeParams::default(), 50.0);
    run_with_pipe(&mut brake, 0.0, 30.0, &tracked);
    assert!(brake.cylinder_psi() > 40.0);

    brake
        .restore_state(&mut StateReader::new(&out))
        .expect("restore");
    assert_eq!(
        brake.triggers,
        PressureTriggers::primed(brake.cylinder_psi(), brake.brake_pipe_psi)
    );

    // Steady released car: the first samples after the rewind stay quiet.
    let mut sink = SignalSink::default();
    for _ in 0..(2.0 / DT) as usize {
        brake.brake_pipe_psi = 90.0;
        brake.update(DT, &tracked, &mut sink);
    }
    let signals: Vec<_> = sink.drain().collect();
    assert!(signals.is_empty(), "{signals:?}");
}

#[test]
fn test_truncated_record_is_rejected_without_change() {
    let brake = charged(CarBrakeParams::default(), 50.0);
    let mut out = Vec::new();
    brake.save_state(&mut out);

    let mut target = charged(CarBrakeParams::default(), 50.0);
    target.brake_pipe_psi = 12.0;
    let mut reader = StateReader::new(&out[..CAR_STATE_LEN - 3]);
    let err = target.restore_state(&mut reader).unwrap_err();
    assert!(matches!(err, PersistError::Truncated { field: "cylinder_volume", .. }));
    assert_eq!(target.brake_pipe_psi, 12.0);
}

#[test]
fn test_invalid_valve_value_is_rejected() {
    let brake = charged(CarBrakeParams::default(), 50.0);
    let mut out = Vec::new();
    brake.save_state(&mut out);
    // triple_valve sits after ten f32 fields and one i32.
    let offset = 11 * 4;
    out[offset..offset + 4].copy_from_slice(&9i32.to_le_bytes());

    let mut target = charged(CarBrakeParams::default(), 50.0);
    let err = target
        .restore_state(&mut StateReader::new(&out))
        .unwrap_err();
    assert_eq!(
        err,
        PersistError::InvalidEnum {
            field: "triple_valve",
            value: 9
        }
    );
}

// -------------------------------------------------------------------------
// Status
// -------------------------------------------------------------------------

#[test]
fn test_status_strings() {
    use crate::units::{BrakeDisplayUnits, PressureUnit};

    let brake = charged(CarBrakeParams::default(), 50.0);
    let units = BrakeDisplayUnits::uniform(PressureUnit::Psi);
    assert_eq!(brake.status(&units), "1P BC 0 psi");
    assert_eq!(brake.full_status(&units), "1P BC 0 psi BP 90 psi");

    let cells = brake.debug_status(&units);
    assert_eq!(cells[0], "1P");
    assert!(cells.contains(&"Release".to_string()));
    assert!(cells.contains(&"EX".to_string()));
}
