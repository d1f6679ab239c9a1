//! Gas Sensor Constants
//!
//! Electrical constants for the MQ-type metal-oxide front end, the per-gas
//! response-curve parameters, and the temperature/humidity correction
//! coefficients. Curve parameters follow the common log-log fit
//! `ppm = A * (Rs/R0)^(-B)` digitized from the manufacturer's datasheet.

// ===== ELECTRICAL =====

/// Supply voltage of the sensor module (volts).
pub const VCC_V: f32 = 5.0;

/// Load resistance on the module's analog output (ohms).
pub const RLOAD_OHM: f32 = 10_000.0;

/// Relative humidity at which the sensor was calibrated (%).
pub const REFERENCE_HUMIDITY_PCT: f32 = 33.0;

/// Voltages below this are treated as "no reading" to avoid division by
/// zero when converting to resistance (volts).
pub const MIN_VALID_VOLTAGE_V: f32 = 0.001;

// ===== ACQUISITION =====

/// Raw analog samples folded into the smoothing filter per acquisition.
pub const GAS_SAMPLE_COUNT: usize = 64;

/// Pause between successive raw samples (milliseconds).
pub const GAS_SAMPLE_PACING_MS: u32 = 1;

/// Smoothing weight alpha = 0.1 in Q15 fixed point (0.1 * 32768).
pub const EMA_ALPHA_Q15: i64 = 3_277;

/// One in Q15 fixed point (2^15).
pub const Q15_ONE: i64 = 32_768;

// ===== CORRECTION POLYNOMIAL =====
// factor = CORA*t^2 - CORB*t + CORC - (h - REFERENCE_HUMIDITY)*CORD

/// Quadratic temperature coefficient.
pub const CORA: f32 = 0.00035;

/// Linear temperature coefficient.
pub const CORB: f32 = 0.02718;

/// Constant term.
pub const CORC: f32 = 1.39538;

/// Humidity-difference coefficient.
pub const CORD: f32 = 0.0018;

/// Tolerance on cached (temperature, humidity) inputs.
///
/// A new pair within this distance of the cached one reuses the cached
/// correction factor instead of recomputing.
pub const CORRECTION_CACHE_TOLERANCE: f32 = 0.1;

// ===== PER-GAS CURVE PARAMETERS =====
// A and B from the datasheet log-log fit; ATM is the typical atmospheric
// concentration in ppm; R0 is the calibration resistance at that level.

/// Carbon dioxide curve scale.
pub const CO2_A: f32 = 116.602_068_2;
/// Carbon dioxide curve exponent.
pub const CO2_B: f32 = 2.769_034_857;
/// Atmospheric CO2 concentration (ppm).
pub const CO2_ATM_PPM: f32 = 400.0;
/// CO2 calibration resistance (ohms).
pub const CO2_R0_OHM: f32 = 930.0;

/// Carbon monoxide curve scale.
pub const CO_A: f32 = 522.677_9;
/// Carbon monoxide curve exponent.
pub const CO_B: f32 = 3.846_5;
/// Atmospheric CO concentration (ppm).
pub const CO_ATM_PPM: f32 = 0.1;
/// CO calibration resistance (ohms).
pub const CO_R0_OHM: f32 = 930.0;

/// Ammonia curve scale.
pub const NH3_A: f32 = 78.923_0;
/// Ammonia curve exponent.
pub const NH3_B: f32 = 3.243_5;
/// Atmospheric NH3 concentration (ppm).
pub const NH3_ATM_PPM: f32 = 0.5;
/// NH3 calibration resistance (ohms).
pub const NH3_R0_OHM: f32 = 930.0;

/// Benzene curve scale.
pub const C6H6_A: f32 = 101.370_8;
/// Benzene curve exponent.
pub const C6H6_B: f32 = 2.508_2;
/// Atmospheric benzene concentration (ppm).
pub const C6H6_ATM_PPM: f32 = 5.0;
/// Benzene calibration resistance (ohms).
pub const C6H6_R0_OHM: f32 = 930.0;

/// Nitrogen dioxide curve scale.
pub const NO2_A: f32 = 45.067_3;
/// Nitrogen dioxide curve exponent.
pub const NO2_B: f32 = 3.483_5;
/// Atmospheric NO2 concentration (ppm).
pub const NO2_ATM_PPM: f32 = 10.0;
/// NO2 calibration resistance (ohms).
pub const NO2_R0_OHM: f32 = 930.0;
