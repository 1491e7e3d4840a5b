//! Brake snapshot of every train in the roster.
//!
//! Unlike a session save this does not recreate trains: it overwrites the air
//! state of trains that already exist, matched by id, so a scenario can be
//! rewound to a known brake condition.
//!
//! ```text
//! u32 train_count
//! train_count x (u32 train_id, train brake record)
//! ```

use std::path::Path;

use simulation::brakes::{put_u32, PersistError, StateReader};
use simulation::train::TrainRoster;

use crate::atomic_write::atomic_write;
use crate::file_header::{read_payload, wrap_with_header, SaveKind};
use crate::save_error::SaveError;

/// Encode the brake state of every train, in roster order.
pub fn encode_brake_snapshot(roster: &TrainRoster) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, roster.trains.len() as u32);
    for train in &roster.trains {
        put_u32(&mut out, train.id);
        train.save_brake_state(&mut out);
    }
    out
}

/// Restore a snapshot into the roster. Every train named in the snapshot must
/// exist with the same car count; on any error the roster is left untouched.
pub fn restore_brake_snapshot(roster: &mut TrainRoster, bytes: &[u8]) -> Result<usize, PersistError> {
    let mut reader = StateReader::new(bytes);
    let count = reader.read_u32("train_count")? as usize;

    let mut restored = Vec::with_capacity(count);
    for _ in 0..count {
        let id = reader.read_u32("train_id")?;
        let mut train = roster
            .get(id)
            .cloned()
            .ok_or(PersistError::UnknownTrain(id))?;
        train.restore_brake_state(&mut reader)?;
        restored.push(train);
    }
    reader.finish()?;

    for train in restored {
        if let Some(slot) = roster.get_mut(train.id) {
            *slot = train;
        }
    }
    Ok(count)
}

/// Write a header-wrapped snapshot to `path`.
pub fn write_brake_snapshot(
    path: impl AsRef<Path>,
    roster: &TrainRoster,
    tick: u64,
) -> Result<usize, SaveError> {
    let payload = encode_brake_snapshot(roster);
    let bytes = wrap_with_header(&payload, SaveKind::BrakeSnapshot, tick, true);
    atomic_write(path, &bytes)?;
    Ok(bytes.len())
}

/// Read a snapshot file and restore it. Returns the tick it was taken at.
pub fn read_brake_snapshot(path: impl AsRef<Path>, roster: &mut TrainRoster) -> Result<u64, SaveError> {
    let bytes = std::fs::read(path)?;
    let (header, payload) = read_payload(&bytes, SaveKind::BrakeSnapshot)?;
    restore_brake_snapshot(roster, &payload)?;
    Ok(header.tick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::brakes::ValveState;
    use simulation::test_harness::freight_consist;
    use simulation::train::ControllerPosition;

    fn roster_with(wagons: &[usize]) -> TrainRoster {
        let mut roster = TrainRoster::default();
        for (i, &n) in wagons.iter().enumerate() {
            roster.add(freight_consist(&format!("train {i}"), n));
        }
        roster
    }

    #[test]
    fn test_snapshot_restores_brake_state() {
        let mut roster = roster_with(&[3, 5]);
        let snapshot = encode_brake_snapshot(&roster);

        for train in &mut roster.trains {
            train.controller.position = ControllerPosition::Emergency;
            for car in &mut train.cars {
                car.brake.brake_pipe_psi = 0.0;
                car.brake.triple_valve = ValveState::Emergency;
            }
        }

        assert_eq!(restore_brake_snapshot(&mut roster, &snapshot), Ok(2));
        assert_eq!(encode_brake_snapshot(&roster), snapshot);
        assert!(roster.trains[1]
            .cars
            .iter()
            .all(|c| c.brake.triple_valve != ValveState::Emergency));
    }

    #[test]
    fn test_unknown_train_rejected_without_changes() {
        let source = roster_with(&[2, 2]);
        let snapshot = encode_brake_snapshot(&source);

        let mut target = roster_with(&[2]);
        target.trains[0].controller.equalizing_reservoir_psi = 55.0;
        let before = target.clone();

        assert_eq!(
            restore_brake_snapshot(&mut target, &snapshot),
            Err(PersistError::UnknownTrain(2))
        );
        assert_eq!(target, before);
    }

    #[test]
    fn test_consist_mismatch_rejected_without_changes() {
        let snapshot = encode_brake_snapshot(&roster_with(&[2, 4]));
        let mut target = roster_with(&[2, 3]);
        let before = target.clone();

        let err = restore_brake_snapshot(&mut target, &snapshot).unwrap_err();
        assert!(matches!(err, PersistError::ConsistMismatch { .. }), "{err}");
        assert_eq!(target, before);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut roster = roster_with(&[1]);
        let mut snapshot = encode_brake_snapshot(&roster);
        snapshot.push(0);
        assert_eq!(
            restore_brake_snapshot(&mut roster, &snapshot),
            Err(PersistError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("railbrake_snapshot_{}", std::process::id()));
        let path = dir.join("rewind.rbrk");
        let mut roster = roster_with(&[6]);
        let expected = encode_brake_snapshot(&roster);

        write_brake_snapshot(&path, &roster, 300).unwrap();
        roster.trains[0].cars[3].brake.aux_res_psi = 12.0;

        assert_eq!(read_brake_snapshot(&path, &mut roster).unwrap(), 300);
        assert_eq!(encode_brake_snapshot(&roster), expected);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
