//! Deterministic brake-tick ordering via `SystemSet` phases.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – Tick counter and operator commands. Everything a tick
//!   reads from the controller is settled here.
//! * **Simulation** – Brake pipe propagation and per-car valve updates for
//!   every train, then coupler, curve and derailment dynamics. Dynamics read
//!   the brake forces computed earlier in the same tick.
//! * **PostSim** – Reporting only: derailment warnings and anything else that
//!   reads simulation state without mutating it.
//!
//! Every `FixedUpdate` system in this crate MUST be in one of these sets.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
///
/// Configured as a chain: `PreSim` → `Simulation` → `PostSim`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    PreSim,
    Simulation,
    PostSim,
}
