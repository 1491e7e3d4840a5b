//! Fixed-order brake snapshot of a whole train.
//!
//! ```text
//! u32 car_count
//! i32 controller_position  f32 equalizing_reservoir  f32 engine_brake_line
//! f32 ep_demand  u8 bail_off  i32 engine_brake_state
//! car_count x (car record, u8 has_locomotive [f32 main_res  u8 compressor_on])
//! ```

use crate::brakes::{put_bool, put_f32, put_i32, put_u32, PersistError, StateReader, ValveState};

use super::controller::ControllerPosition;
use super::types::Train;

impl Train {
    pub fn save_brake_state(&self, out: &mut Vec<u8>) {
        put_u32(out, self.cars.len() as u32);
        put_i32(out, self.controller.position.to_i32());
        put_f32(out, self.controller.equalizing_reservoir_psi);
        put_f32(out, self.controller.engine_brake_line_psi);
        put_f32(out, self.controller.ep_demand);
        put_bool(out, self.controller.bail_off);
        put_i32(out, self.engine_brake_state.to_i32());
        for car in &self.cars {
            car.brake.save_state(out);
            put_bool(out, car.locomotive.is_some());
            if let Some(loco) = &car.locomotive {
                put_f32(out, loco.main_res_psi);
                put_bool(out, loco.compressor_on);
            }
        }
    }

    /// Restore a snapshot written by [`Train::save_brake_state`]. The train
    /// is only modified if the whole snapshot reads cleanly.
    pub fn restore_brake_state(&mut self, reader: &mut StateReader<'_>) -> Result<(), PersistError> {
        let found = reader.read_u32("car_count")? as usize;
        if found != self.cars.len() {
            return Err(PersistError::ConsistMismatch {
                expected: self.cars.len(),
                found,
            });
        }

        let position_raw = reader.read_i32("controller_position")?;
        let position =
            ControllerPosition::from_i32(position_raw).ok_or(PersistError::InvalidEnum {
                field: "controller_position",
                value: position_raw,
            })?;
        let mut restored = self.clone();
        restored.controller.position = position;
        restored.controller.equalizing_reservoir_psi = reader.read_f32("equalizing_reservoir")?;
        restored.controller.engine_brake_line_psi = reader.read_f32("engine_brake_line")?;
        restored.controller.ep_demand = reader.read_f32("ep_demand")?;
        restored.controller.bail_off = reader.read_bool("bail_off")?;
        let state_raw = reader.read_i32("engine_brake_state")?;
        restored.engine_brake_state =
            ValveState::from_i32(state_raw).ok_or(PersistError::InvalidEnum {
                field: "engine_brake_state",
                value: state_raw,
            })?;

        for car in &mut restored.cars {
            car.brake.restore_state(reader)?;
            let has_locomotive = reader.read_bool("has_locomotive")?;
            if has_locomotive != car.locomotive.is_some() {
                return Err(PersistError::InvalidBool {
                    field: "has_locomotive",
                    value: u8::from(has_locomotive),
                });
            }
            if let Some(loco) = car.locomotive.as_mut() {
                loco.main_res_psi = reader.read_f32("main_res")?;
                loco.compressor_on = reader.read_bool("compressor_on")?;
            }
        }

        *self = restored;
        Ok(())
    }
}
