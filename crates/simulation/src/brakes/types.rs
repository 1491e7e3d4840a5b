use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

// =============================================================================
// Valve states
// =============================================================================

/// State shared by the triple valve, the EP holding valve and the engine
/// brake line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum ValveState {
    #[default]
    Lap,
    Apply,
    Release,
    Emergency,
}

impl ValveState {
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Lap => 0,
            Self::Apply => 1,
            Self::Release => 2,
            Self::Emergency => 3,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Lap),
            1 => Some(Self::Apply),
            2 => Some(Self::Release),
            3 => Some(Self::Emergency),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lap => "Lap",
            Self::Apply => "Apply",
            Self::Release => "Release",
            Self::Emergency => "Emergency",
        }
    }
}

// =============================================================================
// Retainers
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum RetainerSetting {
    /// Exhaust: full release.
    #[default]
    Exhaust,
    HighPressure,
    LowPressure,
    SlowDirect,
}

impl RetainerSetting {
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Exhaust => 0,
            Self::HighPressure => 1,
            Self::LowPressure => 2,
            Self::SlowDirect => 3,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Exhaust),
            1 => Some(Self::HighPressure),
            2 => Some(Self::LowPressure),
            3 => Some(Self::SlowDirect),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Exhaust => "EX",
            Self::HighPressure => "HP",
            Self::LowPressure => "LP",
            Self::SlowDirect => "SD",
        }
    }
}

/// Cylinder pressure a retainer holds and the release rate it allows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetainerEffect {
    pub threshold_psi: f32,
    pub release_rate_psi_s: f32,
}

/// Resolve a retainer setting for a car with `positions` retainer positions.
/// Cars without retainers ignore HP and LP; cars with three or fewer
/// positions have no low-pressure setting and treat it as high pressure.
pub fn retainer_effect(
    setting: RetainerSetting,
    positions: u8,
    max_release_rate_psi_s: f32,
) -> RetainerEffect {
    let setting = match setting {
        RetainerSetting::HighPressure | RetainerSetting::LowPressure if positions == 0 => {
            RetainerSetting::Exhaust
        }
        RetainerSetting::LowPressure if positions <= 3 => RetainerSetting::HighPressure,
        other => other,
    };
    match setting {
        RetainerSetting::Exhaust => RetainerEffect {
            threshold_psi: 0.0,
            release_rate_psi_s: max_release_rate_psi_s,
        },
        RetainerSetting::HighPressure => RetainerEffect {
            threshold_psi: 20.0,
            release_rate_psi_s: (50.0 - 20.0) / 90.0,
        },
        RetainerSetting::LowPressure => RetainerEffect {
            threshold_psi: 10.0,
            release_rate_psi_s: (50.0 - 10.0) / 60.0,
        },
        RetainerSetting::SlowDirect => RetainerEffect {
            threshold_psi: 0.0,
            release_rate_psi_s: (50.0 - 10.0) / 86.0,
        },
    }
}

// =============================================================================
// System variants
// =============================================================================

/// The three brake system variants. Each is a fixed combination of
/// [`BrakeCapabilities`]; per-car parameters may add a distributor,
/// an emergency reservoir and so on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum BrakeSystemKind {
    #[default]
    SinglePipe,
    TwinPipe,
    ElectroPneumatic,
}

impl BrakeSystemKind {
    pub fn base_capabilities(self) -> BrakeCapabilities {
        match self {
            Self::SinglePipe => BrakeCapabilities::default(),
            Self::TwinPipe => BrakeCapabilities {
                two_pipes: true,
                ..Default::default()
            },
            Self::ElectroPneumatic => BrakeCapabilities {
                two_pipes: true,
                holding_valve: true,
                ..Default::default()
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SinglePipe => "1P",
            Self::TwinPipe => "2P",
            Self::ElectroPneumatic => "EP",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct BrakeCapabilities {
    /// Car carries a main reservoir pipe alongside the brake pipe.
    pub two_pipes: bool,
    /// Graduated release: the emergency reservoir doubles as a control
    /// reference and the cylinder only releases as far as the pipe recovers.
    pub distributor: bool,
    pub emergency_reservoir: bool,
    /// Electro-pneumatic holding valve.
    pub holding_valve: bool,
    pub handbrake: bool,
    /// Aux reservoir may not be charged from the main reservoir pipe.
    pub no_main_reservoir_aux_charging: bool,
}

impl BrakeCapabilities {
    /// Whether the release threshold follows the control reference.
    pub fn graduated_release(&self) -> bool {
        self.distributor || self.two_pipes
    }
}
