//! Brake signals raised during a tick and the Bevy events they become.
//!
//! Core functions never touch the ECS. They push [`SignalRecord`]s into a
//! [`SignalSink`]; the train system drains the sink into [`BrakeSoundEvent`]s
//! after each train has been stepped.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::train::TrainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrakeSignal {
    BrakePipePressureIncrease,
    BrakePipePressureDecrease,
    BrakePipePressureStoppedChanging,
    TrainBrakePressureIncrease,
    TrainBrakePressureDecrease,
    TrainBrakePressureStoppedChanging,
    EngineBrakePressureIncrease,
    EngineBrakePressureDecrease,
    EngineBrakePressureStoppedChanging,
    CompressorOn,
    CompressorOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRecord {
    pub car_index: usize,
    pub signal: BrakeSignal,
}

/// Signals collected while stepping one train.
#[derive(Debug, Default)]
pub struct SignalSink {
    records: Vec<SignalRecord>,
}

impl SignalSink {
    pub fn emit(&mut self, car_index: usize, signal: BrakeSignal) {
        self.records.push(SignalRecord { car_index, signal });
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalRecord> {
        self.records.iter()
    }

    pub fn contains(&self, signal: BrakeSignal) -> bool {
        self.records.iter().any(|r| r.signal == signal)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = SignalRecord> + '_ {
        self.records.drain(..)
    }
}

/// A brake signal tagged with its train, for audio and animation consumers.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrakeSoundEvent {
    pub train: TrainId,
    pub car_index: usize,
    pub signal: BrakeSignal,
}

/// Raised when a car's lateral/vertical wheel force ratio first exceeds the
/// Nadal limit.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DerailmentWarning {
    pub train: TrainId,
    pub car_index: usize,
    pub force_ratio: f32,
    pub limit: f32,
}
