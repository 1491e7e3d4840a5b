//! Per-car brake configuration.

use bevy::log::debug;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::types::{BrakeCapabilities, BrakeSystemKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct CarBrakeParams {
    pub kind: BrakeSystemKind,
    pub emergency_reservoir: bool,
    pub distributor: bool,
    pub handbrake: bool,
    pub no_main_reservoir_aux_charging: bool,
    pub retainer_positions: u8,
    pub max_cylinder_psi: f32,
    /// Aux reservoir volume over cylinder volume.
    pub aux_cyl_volume_ratio: f32,
    /// Emergency reservoir volume over aux reservoir volume.
    pub emerg_aux_volume_ratio: f32,
    pub emergency_res_volume_m3: f32,
    pub max_release_rate_psi_s: f32,
    pub max_application_rate_psi_s: f32,
    pub emergency_application_rate_psi_s: f32,
    pub max_aux_charging_rate_psi_s: f32,
    pub emergency_res_charging_rate_psi_s: f32,
    /// Rate at which an overcharged aux reservoir leaks back into the pipe.
    pub brake_insensitivity_psi_s: f32,
    pub max_brake_force_n: f32,
    pub max_handbrake_force_n: f32,
    /// Shoe/wheel friction multiplier applied to the shoe force.
    pub brake_shoe_friction_factor: f32,
}

impl Default for CarBrakeParams {
    fn default() -> Self {
        Self {
            kind: BrakeSystemKind::SinglePipe,
            emergency_reservoir: false,
            distributor: false,
            handbrake: true,
            no_main_reservoir_aux_charging: false,
            retainer_positions: 3,
            max_cylinder_psi: 64.0,
            aux_cyl_volume_ratio: 2.5,
            emerg_aux_volume_ratio: 1.4,
            emergency_res_volume_m3: 0.07,
            max_release_rate_psi_s: 1.86,
            max_application_rate_psi_s: 0.9,
            emergency_application_rate_psi_s: 3.0,
            max_aux_charging_rate_psi_s: 1.684,
            emergency_res_charging_rate_psi_s: 1.684,
            brake_insensitivity_psi_s: 0.07,
            max_brake_force_n: 89e3,
            max_handbrake_force_n: 30e3,
            brake_shoe_friction_factor: 1.0,
        }
    }
}

impl CarBrakeParams {
    pub fn single_pipe() -> Self {
        Self::default()
    }

    pub fn twin_pipe() -> Self {
        Self {
            kind: BrakeSystemKind::TwinPipe,
            ..Self::default()
        }
    }

    pub fn electro_pneumatic() -> Self {
        Self {
            kind: BrakeSystemKind::ElectroPneumatic,
            distributor: true,
            ..Self::default()
        }
    }

    pub fn with_emergency_reservoir(mut self) -> Self {
        self.emergency_reservoir = true;
        self
    }

    pub fn capabilities(&self) -> BrakeCapabilities {
        let base = self.kind.base_capabilities();
        BrakeCapabilities {
            distributor: base.distributor || self.distributor,
            emergency_reservoir: base.emergency_reservoir || self.emergency_reservoir,
            handbrake: self.handbrake,
            no_main_reservoir_aux_charging: self.no_main_reservoir_aux_charging,
            ..base
        }
    }

    /// Replace physically meaningless values with defaults. Returns the
    /// names of the fields that were replaced.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut replaced = Vec::new();

        // Ratios and maxima divide later, so they must be strictly positive.
        let mut positive = |value: &mut f32, default: f32, name: &'static str| {
            if !value.is_finite() || *value <= 0.0 {
                *value = default;
                replaced.push(name);
            }
        };
        positive(&mut self.max_cylinder_psi, defaults.max_cylinder_psi, "max_cylinder_psi");
        positive(
            &mut self.aux_cyl_volume_ratio,
            defaults.aux_cyl_volume_ratio,
            "aux_cyl_volume_ratio",
        );
        positive(
            &mut self.emerg_aux_volume_ratio,
            defaults.emerg_aux_volume_ratio,
            "emerg_aux_volume_ratio",
        );

        let mut non_negative = |value: &mut f32, default: f32, name: &'static str| {
            if !value.is_finite() || *value < 0.0 {
                *value = default;
                replaced.push(name);
            }
        };
        non_negative(
            &mut self.emergency_res_volume_m3,
            defaults.emergency_res_volume_m3,
            "emergency_res_volume_m3",
        );
        non_negative(
            &mut self.max_release_rate_psi_s,
            defaults.max_release_rate_psi_s,
            "max_release_rate_psi_s",
        );
        non_negative(
            &mut self.max_application_rate_psi_s,
            defaults.max_application_rate_psi_s,
            "max_application_rate_psi_s",
        );
        non_negative(
            &mut self.emergency_application_rate_psi_s,
            defaults.emergency_application_rate_psi_s,
            "emergency_application_rate_psi_s",
        );
        non_negative(
            &mut self.max_aux_charging_rate_psi_s,
            defaults.max_aux_charging_rate_psi_s,
            "max_aux_charging_rate_psi_s",
        );
        non_negative(
            &mut self.emergency_res_charging_rate_psi_s,
            defaults.emergency_res_charging_rate_psi_s,
            "emergency_res_charging_rate_psi_s",
        );
        non_negative(
            &mut self.brake_insensitivity_psi_s,
            defaults.brake_insensitivity_psi_s,
            "brake_insensitivity_psi_s",
        );
        non_negative(&mut self.max_brake_force_n, defaults.max_brake_force_n, "max_brake_force_n");
        non_negative(
            &mut self.max_handbrake_force_n,
            defaults.max_handbrake_force_n,
            "max_handbrake_force_n",
        );
        non_negative(
            &mut self.brake_shoe_friction_factor,
            defaults.brake_shoe_friction_factor,
            "brake_shoe_friction_factor",
        );

        if !replaced.is_empty() {
            debug!("Brake params defaulted: {}", replaced.join(", "));
        }
        replaced
    }
}
