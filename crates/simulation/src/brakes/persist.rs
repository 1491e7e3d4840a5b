//! Fixed-order little-endian persistence of per-car brake state.
//!
//! Layout of one car record:
//!
//! ```text
//! f32 brake_pipe  f32 second_pipe  f32 engine_line  f32 handbrake_percent
//! f32 release_rate  f32 retainer_threshold  i32 retainer
//! f32 auto_cylinder  f32 aux_res  f32 emergency_res  f32 full_service
//! i32 triple_valve  u8 front_hose  u8 angle_cock_a  u8 angle_cock_b
//! u8 bleed_off  i32 holding_valve  f32 cylinder_volume  u8 bail_off
//! ```
//!
//! The effective cylinder pressure is not stored; it is recomputed on restore.

use std::fmt;

use super::car::AirBrake;
use super::triggers::PressureTriggers;
use super::types::{RetainerSetting, ValveState};

/// Size in bytes of one car record.
pub const CAR_STATE_LEN: usize = 11 * 4 + 3 * 4 + 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    InvalidEnum {
        field: &'static str,
        value: i32,
    },
    InvalidBool {
        field: &'static str,
        value: u8,
    },
    /// Stored car count does not match the consist being restored into.
    ConsistMismatch {
        expected: usize,
        found: usize,
    },
    UnknownTrain(u32),
    TrailingBytes(usize),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Truncated {
                field,
                needed,
                remaining,
            } => write!(
                f,
                "brake state truncated at {field}: needed {needed} bytes, {remaining} left"
            ),
            PersistError::InvalidEnum { field, value } => {
                write!(f, "invalid value {value} for {field}")
            }
            PersistError::InvalidBool { field, value } => {
                write!(f, "invalid boolean byte {value} for {field}")
            }
            PersistError::ConsistMismatch { expected, found } => write!(
                f,
                "consist mismatch: train has {expected} cars, saved state has {found}"
            ),
            PersistError::UnknownTrain(id) => write!(f, "no train with id {id}"),
            PersistError::TrailingBytes(n) => write!(f, "{n} unexpected trailing bytes"),
        }
    }
}

impl std::error::Error for PersistError {}

// =============================================================================
// Primitive writers / reader
// =============================================================================

pub fn put_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_bool(out: &mut Vec<u8>, value: bool) {
    out.push(u8::from(value));
}

/// Cursor over a byte slice. Every read names the field it is reading so a
/// short buffer reports where it ran out.
pub struct StateReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], PersistError> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(PersistError::Truncated {
                field,
                needed: N,
                remaining,
            });
        }
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        Ok(buf)
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, PersistError> {
        self.take::<4>(field).map(f32::from_le_bytes)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, PersistError> {
        self.take::<4>(field).map(i32::from_le_bytes)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, PersistError> {
        self.take::<4>(field).map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, PersistError> {
        self.take::<8>(field).map(u64::from_le_bytes)
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, PersistError> {
        match self.take::<1>(field)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(PersistError::InvalidBool { field, value }),
        }
    }

    pub fn finish(self) -> Result<(), PersistError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(PersistError::TrailingBytes(n)),
        }
    }
}

fn read_valve(reader: &mut StateReader<'_>, field: &'static str) -> Result<ValveState, PersistError> {
    let value = reader.read_i32(field)?;
    ValveState::from_i32(value).ok_or(PersistError::InvalidEnum { field, value })
}

// =============================================================================
// Car record
// =============================================================================

impl AirBrake {
    pub fn save_state(&self, out: &mut Vec<u8>) {
        put_f32(out, self.brake_pipe_psi);
        put_f32(out, self.second_pipe_psi);
        put_f32(out, self.engine_line_psi);
        put_f32(out, self.handbrake_percent);
        put_f32(out, self.release_rate_psi_s);
        put_f32(out, self.retainer_threshold_psi);
        put_i32(out, self.retainer.to_i32());
        put_f32(out, self.auto_cyl_psi);
        put_f32(out, self.aux_res_psi);
        put_f32(out, self.emergency_res_psi);
        put_f32(out, self.full_service_psi);
        put_i32(out, self.triple_valve.to_i32());
        put_bool(out, self.front_hose_connected);
        put_bool(out, self.angle_cock_a_open);
        put_bool(out, self.angle_cock_b_open);
        put_bool(out, self.bleed_off_valve_open);
        put_i32(out, self.holding_valve.to_i32());
        put_f32(out, self.cyl_volume_m3);
        put_bool(out, self.bail_off_on);
    }

    /// Restore a record written by [`AirBrake::save_state`]. On error the car
    /// is left untouched.
    pub fn restore_state(&mut self, reader: &mut StateReader<'_>) -> Result<(), PersistError> {
        let brake_pipe_psi = reader.read_f32("brake_pipe")?;
        let second_pipe_psi = reader.read_f32("second_pipe")?;
        let engine_line_psi = reader.read_f32("engine_line")?;
        let handbrake_percent = reader.read_f32("handbrake_percent")?;
        let release_rate_psi_s = reader.read_f32("release_rate")?;
        let retainer_threshold_psi = reader.read_f32("retainer_threshold")?;
        let retainer_raw = reader.read_i32("retainer")?;
        let retainer = RetainerSetting::from_i32(retainer_raw).ok_or(PersistError::InvalidEnum {
            field: "retainer",
            value: retainer_raw,
        })?;
        let auto_cyl_psi = reader.read_f32("auto_cylinder")?;
        let aux_res_psi = reader.read_f32("aux_res")?;
        let emergency_res_psi = reader.read_f32("emergency_res")?;
        let full_service_psi = reader.read_f32("full_service")?;
        let triple_valve = read_valve(reader, "triple_valve")?;
        let front_hose_connected = reader.read_bool("front_hose")?;
        let angle_cock_a_open = reader.read_bool("angle_cock_a")?;
        let angle_cock_b_open = reader.read_bool("angle_cock_b")?;
        let bleed_off_valve_open = reader.read_bool("bleed_off")?;
        let holding_valve = read_valve(reader, "holding_valve")?;
        let cyl_volume_m3 = reader.read_f32("cylinder_volume")?;
        let bail_off_on = reader.read_bool("bail_off")?;

        self.brake_pipe_psi = brake_pipe_psi;
        self.second_pipe_psi = second_pipe_psi;
        self.engine_line_psi = engine_line_psi;
        self.handbrake_percent = handbrake_percent;
        self.release_rate_psi_s = release_rate_psi_s;
        self.retainer_threshold_psi = retainer_threshold_psi;
        self.retainer = retainer;
        self.auto_cyl_psi = auto_cyl_psi;
        self.aux_res_psi = aux_res_psi;
        self.emergency_res_psi = emergency_res_psi;
        self.full_service_psi = full_service_psi;
        self.triple_valve = triple_valve;
        self.front_hose_connected = front_hose_connected;
        self.angle_cock_a_open = angle_cock_a_open;
        self.angle_cock_b_open = angle_cock_b_open;
        self.bleed_off_valve_open = bleed_off_valve_open;
        self.holding_valve = holding_valve;
        self.cyl_volume_m3 = cyl_volume_m3;
        self.bail_off_on = bail_off_on;

        self.refresh_cylinder();
        self.triggers = PressureTriggers::primed(self.cyl_psi, self.brake_pipe_psi);
        self.update_brake_force();
        Ok(())
    }
}
