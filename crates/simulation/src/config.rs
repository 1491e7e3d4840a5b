/// Rate of the fixed brake schedule.
pub const FIXED_TICK_HZ: f64 = 30.0;

pub const GRAVITY_MPS2: f32 = 9.806_65;
pub const ONE_ATMOSPHERE_PSI: f32 = 14.695_95;

/// Inner diameter of a 1-1/4" brake pipe.
pub const BRAKE_PIPE_DIAMETER_M: f32 = 0.032;

/// Hose allowance added to the body length of every car.
pub const BRAKE_HOSE_ALLOWANCE_M: f32 = 1.0;

/// Floor on the effective pipe length. Keeps the pipe volume of very short
/// (or zero-length) cars large enough that per-step deltas stay bounded.
pub const MIN_BRAKE_PIPE_LENGTH_M: f32 = 5.0;

/// Aux reservoir to brake pipe volume ratio used when a car has no
/// emergency reservoir volume to derive it from.
pub const DEFAULT_AUX_BRAKE_LINE_VOLUME_RATIO: f32 = 3.1;

/// Pressures below this are treated as empty.
pub const NEAR_ZERO_PSI: f32 = 0.01;

pub const STANDARD_GAUGE_M: f32 = 1.435;

/// Largest fraction of a pressure difference two linked cars may exchange in
/// one sub-step. Jacobi diffusion stays monotone at or below one half.
pub const MAX_PAIR_TRANSFER_FRACTION: f32 = 0.5;

/// Above this reference pressure the quick-release rule applies.
pub const QUICK_RELEASE_MIN_REFERENCE_PSI: f32 = 70.0;

/// Brake pipe must exceed this share of the reference pressure to trigger
/// a quick release.
pub const QUICK_RELEASE_REFERENCE_SHARE: f32 = 0.97;

/// Margin (psi) the brake pipe must move past the aux reservoir before the
/// triple valve changes state.
pub const TRIPLE_VALVE_SENSITIVITY_PSI: f32 = 1.0;

/// Below `full_service - margin` the triple valve goes to emergency.
pub const EMERGENCY_MARGIN_PSI: f32 = 1.0;

/// Equalizing reservoir target above full charge in the Overcharge position.
pub const OVERCHARGE_PSI: f32 = 5.0;

/// Brake pipe time factor (s) for trains without a lead locomotive.
pub const DEFAULT_BRAKE_PIPE_TIME_FACTOR_S: f32 = 0.0015;

/// Coupler length beyond the car body, per end.
pub const COUPLER_LENGTH_M: f32 = 1.0;

/// Wheel flange contact angle used for the Nadal limit.
pub const FLANGE_ANGLE_DEG: f32 = 70.0;
/// Flange/rail friction coefficient used for the Nadal limit.
pub const FLANGE_FRICTION: f32 = 0.25;
/// Share of the Nadal limit at which a derailment becomes possible.
pub const DERAIL_POSSIBLE_SHARE: f32 = 0.85;

/// Below this speed a car is treated as stationary for resistance purposes.
pub const STATIONARY_SPEED_MPS: f32 = 0.01;
