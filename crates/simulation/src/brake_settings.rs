//! Runtime-tunable brake simulation parameters.
//!
//! Values that previously lived as fixed constants in the propagation and
//! dynamics code are collected into [`BrakeSimSettings`] so a host can tune
//! them without recompiling. Overrides persist through the `Saveable`
//! extension map; the default settings are never written.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_BRAKE_PIPE_TIME_FACTOR_S, STANDARD_GAUGE_M};

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
#[serde(default)]
pub struct BrakeSimSettings {
    /// Longest tick the brake core will integrate in one call. Longer frames
    /// (debugger pauses, hitches) are clamped to this.
    pub max_tick_seconds: f32,
    /// Upper bound on brake pipe sub-steps per tick.
    pub max_substeps: u32,
    /// Brake pipe time factor used when a train has no lead locomotive.
    pub fallback_brake_pipe_time_factor_s: f32,
    pub track_gauge_m: f32,
    /// Wheel/rail friction coefficient used for curve resistance.
    pub wagon_coefficient_friction: f32,
    /// Time constant of the exponential filter on curve force.
    pub curve_force_filter_seconds: f32,
    /// Minimum interval between pressure-change sound triggers on a locomotive.
    pub sound_trigger_interval_s: f32,
}

impl Default for BrakeSimSettings {
    fn default() -> Self {
        Self {
            max_tick_seconds: 0.25,
            max_substeps: 4096,
            fallback_brake_pipe_time_factor_s: DEFAULT_BRAKE_PIPE_TIME_FACTOR_S,
            track_gauge_m: STANDARD_GAUGE_M,
            wagon_coefficient_friction: 0.5,
            curve_force_filter_seconds: 1.0,
            sound_trigger_interval_s: 0.5,
        }
    }
}

impl BrakeSimSettings {
    /// Clamp a raw frame time into `[0, max_tick_seconds]`. Non-finite or
    /// negative input integrates nothing.
    pub fn clamp_elapsed(&self, raw_elapsed_s: f32) -> f32 {
        if !raw_elapsed_s.is_finite() || raw_elapsed_s <= 0.0 {
            return 0.0;
        }
        raw_elapsed_s.min(self.max_tick_seconds.max(0.0))
    }
}

/// Everything a tick of the brake core needs besides the train itself.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub elapsed_s: f32,
    pub settings: &'a BrakeSimSettings,
}

impl<'a> TickContext<'a> {
    pub fn new(raw_elapsed_s: f32, settings: &'a BrakeSimSettings) -> Self {
        Self {
            elapsed_s: settings.clamp_elapsed(raw_elapsed_s),
            settings,
        }
    }
}

impl crate::Saveable for BrakeSimSettings {
    const SAVE_KEY: &'static str = "brake_settings";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if *self == Self::default() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

pub struct BrakeSettingsPlugin;

impl Plugin for BrakeSettingsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BrakeSimSettings>();

        app.world_mut()
            .get_resource_or_insert_with(crate::SaveableRegistry::default)
            .register::<BrakeSimSettings>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Saveable;

    #[test]
    fn test_clamp_elapsed_caps_long_frames() {
        let settings = BrakeSimSettings::default();
        assert_eq!(settings.clamp_elapsed(3.0), 0.25);
        assert_eq!(settings.clamp_elapsed(0.1), 0.1);
    }

    #[test]
    fn test_clamp_elapsed_rejects_garbage() {
        let settings = BrakeSimSettings::default();
        assert_eq!(settings.clamp_elapsed(-1.0), 0.0);
        assert_eq!(settings.clamp_elapsed(f32::NAN), 0.0);
        assert_eq!(settings.clamp_elapsed(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_default_settings_skip_save() {
        assert!(BrakeSimSettings::default().save_to_bytes().is_none());
    }

    #[test]
    fn test_overridden_settings_survive_save() {
        let settings = BrakeSimSettings {
            max_substeps: 128,
            wagon_coefficient_friction: 0.3,
            ..Default::default()
        };
        let bytes = settings.save_to_bytes().expect("non-default settings must save");
        assert_eq!(BrakeSimSettings::load_from_bytes(&bytes), settings);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: BrakeSimSettings =
            serde_json::from_str(r#"{ "max_tick_seconds": 0.1 }"#).expect("valid json");
        assert_eq!(settings.max_tick_seconds, 0.1);
        assert_eq!(settings.max_substeps, 4096);
    }
}
