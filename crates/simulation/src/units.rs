//! Pressure display units and formatting.
//!
//! All pressures are stored internally in psi. Conversion happens only when
//! a value is formatted for display.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

const KPA_PER_PSI: f32 = 6.894_757;
const BAR_PER_PSI: f32 = 0.068_947_57;
const INHG_PER_PSI: f32 = 2.036_021;
const KGF_CM2_PER_PSI: f32 = 0.070_306_96;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum PressureUnit {
    #[default]
    Psi,
    InHg,
    Bar,
    KPa,
    KgfPerCm2,
}

impl PressureUnit {
    pub fn from_psi(self, psi: f32) -> f32 {
        match self {
            Self::Psi => psi,
            Self::InHg => psi * INHG_PER_PSI,
            Self::Bar => psi * BAR_PER_PSI,
            Self::KPa => psi * KPA_PER_PSI,
            Self::KgfPerCm2 => psi * KGF_CM2_PER_PSI,
        }
    }

    pub fn to_psi(self, value: f32) -> f32 {
        match self {
            Self::Psi => value,
            Self::InHg => value / INHG_PER_PSI,
            Self::Bar => value / BAR_PER_PSI,
            Self::KPa => value / KPA_PER_PSI,
            Self::KgfPerCm2 => value / KGF_CM2_PER_PSI,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Psi => "psi",
            Self::InHg => "inHg",
            Self::Bar => "bar",
            Self::KPa => "kPa",
            Self::KgfPerCm2 => "kgf/cm²",
        }
    }

    fn decimals(self) -> usize {
        match self {
            Self::Psi | Self::InHg | Self::KPa => 0,
            Self::Bar | Self::KgfPerCm2 => 2,
        }
    }
}

/// Format a psi value in `unit`, optionally followed by the unit suffix.
pub fn format_pressure(psi: f32, unit: PressureUnit, show_unit: bool) -> String {
    let value = unit.from_psi(psi);
    let decimals = unit.decimals();
    if show_unit {
        format!("{value:.decimals$} {}", unit.suffix())
    } else {
        format!("{value:.decimals$}")
    }
}

/// Brake system components that carry their own display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrakeComponent {
    BrakeCylinder,
    BrakePipe,
    AuxiliaryReservoir,
    EmergencyReservoir,
    MainReservoir,
    MainReservoirPipe,
    EqualizingReservoir,
}

/// Per-component display units, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct BrakeDisplayUnits {
    pub brake_cylinder: PressureUnit,
    pub brake_pipe: PressureUnit,
    pub auxiliary_reservoir: PressureUnit,
    pub emergency_reservoir: PressureUnit,
    pub main_reservoir: PressureUnit,
    pub main_reservoir_pipe: PressureUnit,
    pub equalizing_reservoir: PressureUnit,
}

impl BrakeDisplayUnits {
    pub fn uniform(unit: PressureUnit) -> Self {
        Self {
            brake_cylinder: unit,
            brake_pipe: unit,
            auxiliary_reservoir: unit,
            emergency_reservoir: unit,
            main_reservoir: unit,
            main_reservoir_pipe: unit,
            equalizing_reservoir: unit,
        }
    }

    /// Bar everywhere except the brake cylinder, which is commonly read in kPa.
    pub fn metric() -> Self {
        Self {
            brake_cylinder: PressureUnit::KPa,
            ..Self::uniform(PressureUnit::Bar)
        }
    }

    pub fn get(&self, component: BrakeComponent) -> PressureUnit {
        match component {
            BrakeComponent::BrakeCylinder => self.brake_cylinder,
            BrakeComponent::BrakePipe => self.brake_pipe,
            BrakeComponent::AuxiliaryReservoir => self.auxiliary_reservoir,
            BrakeComponent::EmergencyReservoir => self.emergency_reservoir,
            BrakeComponent::MainReservoir => self.main_reservoir,
            BrakeComponent::MainReservoirPipe => self.main_reservoir_pipe,
            BrakeComponent::EqualizingReservoir => self.equalizing_reservoir,
        }
    }

    /// Format `psi` in the unit configured for `component`.
    pub fn format(&self, component: BrakeComponent, psi: f32) -> String {
        format_pressure(psi, self.get(component), true)
    }
}
