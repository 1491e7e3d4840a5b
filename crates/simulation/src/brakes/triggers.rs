//! Rate-limited pressure-change sound triggers for locomotives.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::events::{BrakeSignal, SignalSink};

/// Change (psi) over one trigger interval that counts as "changing".
const CHANGE_THRESHOLD_PSI: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
enum Trend {
    #[default]
    Steady,
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PressureTriggers {
    timer_s: f32,
    prev_cylinder_psi: f32,
    prev_pipe_psi: f32,
    cylinder_trend: Trend,
    pipe_trend: Trend,
}

impl PressureTriggers {
    /// Start sampling from known pressures so the first interval compares
    /// against them instead of zero.
    pub fn primed(cylinder_psi: f32, pipe_psi: f32) -> Self {
        Self {
            prev_cylinder_psi: cylinder_psi,
            prev_pipe_psi: pipe_psi,
            ..Default::default()
        }
    }

    /// Sample the cylinder and brake pipe every `interval_s` and emit a
    /// signal when either starts, stops or reverses.
    pub fn update(
        &mut self,
        elapsed_s: f32,
        interval_s: f32,
        cylinder_psi: f32,
        pipe_psi: f32,
        car_index: usize,
        signals: &mut SignalSink,
    ) {
        self.timer_s += elapsed_s;
        if self.timer_s < interval_s {
            return;
        }
        self.timer_s = 0.0;

        if let Some(signal) = Self::edge(
            &mut self.cylinder_trend,
            cylinder_psi - self.prev_cylinder_psi,
            [
                BrakeSignal::TrainBrakePressureIncrease,
                BrakeSignal::TrainBrakePressureDecrease,
                BrakeSignal::TrainBrakePressureStoppedChanging,
            ],
        ) {
            signals.emit(car_index, signal);
        }
        if let Some(signal) = Self::edge(
            &mut self.pipe_trend,
            pipe_psi - self.prev_pipe_psi,
            [
                BrakeSignal::BrakePipePressureIncrease,
                BrakeSignal::BrakePipePressureDecrease,
                BrakeSignal::BrakePipePressureStoppedChanging,
            ],
        ) {
            signals.emit(car_index, signal);
        }

        self.prev_cylinder_psi = cylinder_psi;
        self.prev_pipe_psi = pipe_psi;
    }

    /// `[increase, decrease, stopped]`, emitted when the trend changes.
    fn edge(trend: &mut Trend, delta: f32, signals: [BrakeSignal; 3]) -> Option<BrakeSignal> {
        let next = if delta > CHANGE_THRESHOLD_PSI {
            Trend::Increasing
        } else if delta < -CHANGE_THRESHOLD_PSI {
            Trend::Decreasing
        } else {
            Trend::Steady
        };
        if next == *trend {
            return None;
        }
        *trend = next;
        Some(match next {
            Trend::Increasing => signals[0],
            Trend::Decreasing => signals[1],
            Trend::Steady => signals[2],
        })
    }
}
