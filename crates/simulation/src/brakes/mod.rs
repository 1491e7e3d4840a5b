//! Per-car automatic air brake.
//!
//! Each car carries an [`AirBrake`]: brake pipe, auxiliary and emergency
//! reservoirs, brake cylinder, optional main reservoir pipe and engine brake
//! line, and the triple valve that moves air between them.
//!
//! - The triple valve compares brake pipe, aux reservoir and the control
//!   reference and picks Apply / Lap / Release / Emergency.
//! - Apply moves air from aux into the cylinder; emergency also dumps the
//!   emergency reservoir into aux.
//! - Release exhausts the cylinder down to the retainer (or graduated
//!   release) threshold and recharges aux from the brake pipe.
//! - Twin-pipe cars recharge aux from the main reservoir pipe; EP cars add a
//!   holding valve and drive the cylinder directly from a demand signal.
//!
//! The model is a plain value type. Train-level code decides the order in
//! which cars are stepped.

mod car;
mod holding_valve;
mod params;
mod persist;
mod status;
mod triggers;
mod types;
mod valve;

#[cfg(test)]
mod tests;

pub use car::{brake_pipe_volume_m3, AirBrake, BrakeInit};
pub use holding_valve::{EP_DEMAND_LAP, EP_DEMAND_RELEASE};
pub use params::CarBrakeParams;
pub use persist::{
    put_bool, put_f32, put_i32, put_u32, PersistError, StateReader, CAR_STATE_LEN,
};
pub use triggers::PressureTriggers;
pub use types::{
    retainer_effect, BrakeCapabilities, BrakeSystemKind, RetainerEffect, RetainerSetting,
    ValveState,
};
pub use valve::{next_triple_valve_state, CarUpdateContext, ValveInputs};
