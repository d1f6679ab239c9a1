//! Gas Concentration Estimation
//!
//! ## Overview
//!
//! Converts raw analog readings from a metal-oxide gas sensor into a ppm
//! concentration estimate. The pipeline per acquisition:
//!
//! 1. Fold [`GAS_SAMPLE_COUNT`] raw samples into a Q15 fixed-point
//!    exponential moving average ([`EmaQ15`]), pacing samples 1 ms apart.
//! 2. Convert the smoothed millivolt value to sensor resistance via the
//!    voltage-divider equation `Rs = RLOAD * (VCC/V - 1)`.
//! 3. Apply a temperature/humidity correction factor (quadratic in
//!    temperature, linear in humidity offset from the calibration point).
//!    The factor is cached in a single slot keyed on the input pair.
//! 4. Map corrected `Rs/R0` through the gas's log-log response curve
//!    `ppm = A * (Rs/R0)^(-B)`.
//!
//! The EMA runs in integer Q15 so the hot sampling loop stays off the FPU;
//! floating point only enters at the resistance conversion.
//!
//! ## Hardware seams
//!
//! The estimator is generic over [`AnalogSource`] (the ADC channel, `nb`
//! non-blocking read) and [`AdcCalibration`] (raw-count-to-millivolt
//! conversion), so host tests drive it with scripted sources.

use crate::constants::gas::{
    CORA, CORB, CORC, CORD, CORRECTION_CACHE_TOLERANCE, EMA_ALPHA_Q15, GAS_SAMPLE_COUNT,
    GAS_SAMPLE_PACING_MS, MIN_VALID_VOLTAGE_V, Q15_ONE, REFERENCE_HUMIDITY_PCT, RLOAD_OHM, VCC_V,
};
use crate::constants::gas::{
    C6H6_A, C6H6_ATM_PPM, C6H6_B, C6H6_R0_OHM, CO2_A, CO2_ATM_PPM, CO2_B, CO2_R0_OHM, CO_A,
    CO_ATM_PPM, CO_B, CO_R0_OHM, NH3_A, NH3_ATM_PPM, NH3_B, NH3_R0_OHM, NO2_A, NO2_ATM_PPM, NO2_B,
    NO2_R0_OHM,
};
use crate::time::DelayMs;

/// Gas species with a characterized response curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GasKind {
    /// Carbon dioxide
    Co2,
    /// Carbon monoxide
    Co,
    /// Ammonia
    Nh3,
    /// Benzene
    C6h6,
    /// Nitrogen dioxide
    No2,
}

/// Response-curve parameters for one gas
///
/// Derived quantities (`1/B`, `-B`, `ATM/A`) are precomputed at
/// construction so the per-reading path is a single `powf` plus a multiply.
#[derive(Debug, Clone, Copy)]
pub struct GasProfile {
    kind: GasKind,
    /// Curve scale from the datasheet fit
    a: f32,
    /// Negated curve exponent, ready for `powf`
    neg_b: f32,
    /// Reciprocal exponent, for solving the curve for Rs/R0
    inv_b: f32,
    /// Typical atmospheric concentration over curve scale
    atm_div_a: f32,
    /// Calibration resistance at atmospheric concentration (ohms)
    r0: f32,
}

impl GasProfile {
    /// Build a profile from datasheet fit parameters
    pub fn new(kind: GasKind, a: f32, b: f32, atm_ppm: f32, r0_ohm: f32) -> Self {
        Self {
            kind,
            a,
            neg_b: -b,
            inv_b: 1.0 / b,
            atm_div_a: atm_ppm / a,
            r0: r0_ohm,
        }
    }

    /// Which gas this profile describes
    pub fn kind(&self) -> GasKind {
        self.kind
    }

    /// Concentration at a given corrected sensor resistance
    pub fn ppm_at(&self, rs_ohm: f32) -> f32 {
        self.a * libm::powf(rs_ohm / self.r0, self.neg_b)
    }

    /// Resistance the sensor should show at atmospheric concentration.
    ///
    /// Solves the response curve for Rs given the atmospheric ppm; used
    /// during field calibration to derive R0 from a clean-air reading.
    pub fn calibration_r0(&self, rs_clean_air_ohm: f32) -> f32 {
        rs_clean_air_ohm * libm::powf(self.atm_div_a, self.inv_b)
    }
}

/// The full set of characterized gases
#[derive(Debug, Clone, Copy)]
pub struct GasTable {
    profiles: [GasProfile; 5],
}

impl GasTable {
    /// Table with the stock datasheet parameters
    pub fn new() -> Self {
        Self {
            profiles: [
                GasProfile::new(GasKind::Co2, CO2_A, CO2_B, CO2_ATM_PPM, CO2_R0_OHM),
                GasProfile::new(GasKind::Co, CO_A, CO_B, CO_ATM_PPM, CO_R0_OHM),
                GasProfile::new(GasKind::Nh3, NH3_A, NH3_B, NH3_ATM_PPM, NH3_R0_OHM),
                GasProfile::new(GasKind::C6h6, C6H6_A, C6H6_B, C6H6_ATM_PPM, C6H6_R0_OHM),
                GasProfile::new(GasKind::No2, NO2_A, NO2_B, NO2_ATM_PPM, NO2_R0_OHM),
            ],
        }
    }

    /// Look up one gas's profile
    pub fn profile(&self, kind: GasKind) -> &GasProfile {
        match kind {
            GasKind::Co2 => &self.profiles[0],
            GasKind::Co => &self.profiles[1],
            GasKind::Nh3 => &self.profiles[2],
            GasKind::C6h6 => &self.profiles[3],
            GasKind::No2 => &self.profiles[4],
        }
    }

    /// All profiles, for iteration
    pub fn profiles(&self) -> &[GasProfile] {
        &self.profiles
    }
}

impl Default for GasTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Q15 fixed-point exponential moving average
///
/// `value += alpha * (sample - value)` with alpha = 0.1 carried as
/// 3277/32768. State is i64 so the widening multiply cannot overflow for
/// any u16 sample stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaQ15 {
    value_q15: i64,
    seeded: bool,
}

impl EmaQ15 {
    /// Unseeded filter; the first sample becomes the initial value
    pub const fn new() -> Self {
        Self {
            value_q15: 0,
            seeded: false,
        }
    }

    /// Fold in one sample and return the smoothed value
    pub fn update(&mut self, sample: u16) -> u16 {
        let sample_q15 = (sample as i64) << 15;
        if self.seeded {
            self.value_q15 += (EMA_ALPHA_Q15 * (sample_q15 - self.value_q15)) / Q15_ONE;
        } else {
            self.value_q15 = sample_q15;
            self.seeded = true;
        }
        self.value()
    }

    /// Current smoothed value, rounded to the nearest integer
    pub fn value(&self) -> u16 {
        ((self.value_q15 + (Q15_ONE / 2)) >> 15) as u16
    }

    /// Discard all state
    pub fn reset(&mut self) {
        self.value_q15 = 0;
        self.seeded = false;
    }
}

/// Non-blocking analog input channel
///
/// `nb::Result` matches embedded ADC drivers: `WouldBlock` while a
/// conversion is in flight, a value when it completes.
pub trait AnalogSource {
    /// Driver-specific read failure
    type Error;

    /// Start or continue a conversion
    fn read_raw(&mut self) -> nb::Result<u16, Self::Error>;
}

/// Conversion from raw ADC counts to millivolts
///
/// Kept separate from [`AnalogSource`] because calibration data usually
/// lives in the chip's efuse block, not in the channel driver.
pub trait AdcCalibration {
    /// Convert one raw reading to millivolts
    fn raw_to_millivolts(&self, raw: u16) -> u32;
}

/// Identity calibration for pre-scaled sources and host tests
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCalibration;

impl AdcCalibration for UnitCalibration {
    fn raw_to_millivolts(&self, raw: u16) -> u32 {
        raw as u32
    }
}

/// Cached correction factor keyed on its (temperature, humidity) inputs
#[derive(Debug, Clone, Copy)]
struct CorrectionSlot {
    temperature: f32,
    humidity: f32,
    factor: f32,
}

impl CorrectionSlot {
    /// Whether a new input pair is close enough to reuse this slot
    fn matches(&self, temperature: f32, humidity: f32) -> bool {
        libm::fabsf(temperature - self.temperature) < CORRECTION_CACHE_TOLERANCE
            && libm::fabsf(humidity - self.humidity) < CORRECTION_CACHE_TOLERANCE
    }
}

/// Smoothing, correction, and curve mapping for one gas channel
#[derive(Debug)]
pub struct GasConcentrationEstimator {
    table: GasTable,
    ema: EmaQ15,
    cache: Option<CorrectionSlot>,
    /// Correction factors computed from scratch, for cache diagnostics
    recomputes: u32,
}

impl GasConcentrationEstimator {
    /// Estimator with the stock gas table and an empty cache
    pub fn new() -> Self {
        Self::with_table(GasTable::new())
    }

    /// Estimator with a custom (e.g. recalibrated) gas table
    pub fn with_table(table: GasTable) -> Self {
        Self {
            table,
            ema: EmaQ15::new(),
            cache: None,
            recomputes: 0,
        }
    }

    /// The active gas table
    pub fn table(&self) -> &GasTable {
        &self.table
    }

    /// Acquire one smoothed millivolt reading.
    ///
    /// Blocks on each of the [`GAS_SAMPLE_COUNT`] raw conversions, folds
    /// them through the Q15 filter, and paces samples 1 ms apart. The
    /// filter keeps its state across acquisitions, so successive readings
    /// converge rather than restarting.
    pub fn acquire_millivolts<A, C, D>(
        &mut self,
        adc: &mut A,
        calibration: &C,
        delay: &mut D,
    ) -> Result<u32, A::Error>
    where
        A: AnalogSource,
        C: AdcCalibration,
        D: DelayMs,
    {
        for i in 0..GAS_SAMPLE_COUNT {
            let raw = nb::block!(adc.read_raw())?;
            self.ema.update(raw);
            if i + 1 < GAS_SAMPLE_COUNT {
                delay.delay_ms(GAS_SAMPLE_PACING_MS);
            }
        }
        Ok(calibration.raw_to_millivolts(self.ema.value()))
    }

    /// Sensor resistance from a millivolt reading via the voltage divider.
    ///
    /// Readings below the validity floor return infinity: the divider
    /// equation blows up at 0 V, and an open or unpowered sensor reads as
    /// "infinite resistance", which maps to ~0 ppm downstream.
    pub fn resistance_from_millivolts(&self, millivolts: u32) -> f32 {
        let volts = millivolts as f32 / 1_000.0;
        if volts < MIN_VALID_VOLTAGE_V {
            return f32::INFINITY;
        }
        RLOAD_OHM * (VCC_V / volts - 1.0)
    }

    /// Temperature/humidity correction factor, with single-slot caching.
    ///
    /// Ambient conditions drift slowly relative to the sampling rate, so a
    /// pair within [`CORRECTION_CACHE_TOLERANCE`] of the cached one reuses
    /// the cached factor. Any other pair recomputes and replaces the slot.
    pub fn correction_factor(&mut self, temperature: f32, humidity: f32) -> f32 {
        if let Some(slot) = &self.cache {
            if slot.matches(temperature, humidity) {
                return slot.factor;
            }
        }

        let factor = CORA * temperature * temperature - CORB * temperature + CORC
            - (humidity - REFERENCE_HUMIDITY_PCT) * CORD;
        self.cache = Some(CorrectionSlot {
            temperature,
            humidity,
            factor,
        });
        self.recomputes += 1;
        factor
    }

    /// Resistance normalized to calibration conditions
    pub fn corrected_resistance(&mut self, rs_ohm: f32, temperature: f32, humidity: f32) -> f32 {
        rs_ohm / self.correction_factor(temperature, humidity)
    }

    /// Concentration of `kind` at the given raw resistance and conditions
    pub fn corrected_ppm(
        &mut self,
        kind: GasKind,
        rs_ohm: f32,
        temperature: f32,
        humidity: f32,
    ) -> f32 {
        let corrected = self.corrected_resistance(rs_ohm, temperature, humidity);
        self.table.profile(kind).ppm_at(corrected)
    }

    /// Invalidate the cached correction factor
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// From-scratch correction computations so far
    pub fn recompute_count(&self) -> u32 {
        self.recomputes
    }

    /// Discard filter state so the next acquisition starts fresh
    pub fn reset_filter(&mut self) {
        self.ema.reset();
    }
}

impl Default for GasConcentrationEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Optional gas input for the telemetry cycle
///
/// Nodes without the gas sensor fitted plug in [`NoGas`]; nodes with it use
/// [`MqGasChannel`]. The cycle treats `None` as "field absent".
pub trait GasChannel {
    /// One full acquisition under the given ambient conditions
    fn sample_ppm(&mut self, temperature: f32, humidity: f32) -> Option<f32>;
}

/// Gas channel for nodes without the sensor fitted
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGas;

impl GasChannel for NoGas {
    fn sample_ppm(&mut self, _temperature: f32, _humidity: f32) -> Option<f32> {
        None
    }
}

/// Gas channel backed by a real analog front end
#[derive(Debug)]
pub struct MqGasChannel<A, C, D> {
    estimator: GasConcentrationEstimator,
    kind: GasKind,
    adc: A,
    calibration: C,
    delay: D,
}

impl<A, C, D> MqGasChannel<A, C, D>
where
    A: AnalogSource,
    C: AdcCalibration,
    D: DelayMs,
{
    /// Channel measuring `kind` on the given hardware
    pub fn new(kind: GasKind, adc: A, calibration: C, delay: D) -> Self {
        Self {
            estimator: GasConcentrationEstimator::new(),
            kind,
            adc,
            calibration,
            delay,
        }
    }

    /// The estimator, for calibration and diagnostics
    pub fn estimator(&self) -> &GasConcentrationEstimator {
        &self.estimator
    }
}

impl<A, C, D> GasChannel for MqGasChannel<A, C, D>
where
    A: AnalogSource,
    C: AdcCalibration,
    D: DelayMs,
{
    fn sample_ppm(&mut self, temperature: f32, humidity: f32) -> Option<f32> {
        let millivolts = self
            .estimator
            .acquire_millivolts(&mut self.adc, &self.calibration, &mut self.delay)
            .ok()?;
        let rs = self.estimator.resistance_from_millivolts(millivolts);
        if !rs.is_finite() {
            log::warn!("gas channel read {} mV, below validity floor", millivolts);
            return None;
        }
        Some(
            self.estimator
                .corrected_ppm(self.kind, rs, temperature, humidity),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::NoDelay;
    use core::convert::Infallible;

    /// Analog source replaying a fixed script, repeating the last value
    struct ScriptedAdc {
        samples: heapless::Vec<u16, 128>,
        index: usize,
    }

    impl ScriptedAdc {
        fn constant(value: u16) -> Self {
            let mut samples = heapless::Vec::new();
            samples.push(value).unwrap();
            Self { samples, index: 0 }
        }
    }

    impl AnalogSource for ScriptedAdc {
        type Error = Infallible;

        fn read_raw(&mut self) -> nb::Result<u16, Infallible> {
            let value = self.samples[self.index.min(self.samples.len() - 1)];
            self.index += 1;
            Ok(value)
        }
    }

    #[test]
    fn ema_seeds_on_first_sample() {
        let mut ema = EmaQ15::new();
        assert_eq!(ema.update(1_000), 1_000);
    }

    #[test]
    fn ema_converges_toward_constant_input() {
        let mut ema = EmaQ15::new();
        ema.update(0);
        let mut last = 0;
        for _ in 0..100 {
            last = ema.update(2_000);
        }
        // alpha = 0.1 closes >99.99% of the gap within 100 steps
        assert!(last >= 1_999, "converged to {last}");
    }

    #[test]
    fn ema_single_step_matches_q15_arithmetic() {
        let mut ema = EmaQ15::new();
        ema.update(1_000);
        // 1000 + 3277*(2000-1000)/32768 = 1100.006 -> 1100
        assert_eq!(ema.update(2_000), 1_100);
    }

    #[test]
    fn acquisition_smooths_scripted_samples() {
        let mut estimator = GasConcentrationEstimator::new();
        let mut adc = ScriptedAdc::constant(1_650);
        let mv = estimator
            .acquire_millivolts(&mut adc, &UnitCalibration, &mut NoDelay)
            .unwrap();
        assert_eq!(mv, 1_650);
    }

    #[test]
    fn resistance_follows_voltage_divider() {
        let estimator = GasConcentrationEstimator::new();
        // 2.5 V across a 10k load on 5 V supply: Rs = 10k * (5/2.5 - 1) = 10k
        let rs = estimator.resistance_from_millivolts(2_500);
        assert!((rs - 10_000.0).abs() < 1.0, "rs = {rs}");
    }

    #[test]
    fn zero_voltage_reads_as_infinite_resistance() {
        let estimator = GasConcentrationEstimator::new();
        assert!(estimator.resistance_from_millivolts(0).is_infinite());
    }

    #[test]
    fn correction_cache_hits_within_tolerance() {
        let mut estimator = GasConcentrationEstimator::new();

        let first = estimator.correction_factor(20.0, 33.0);
        assert_eq!(estimator.recompute_count(), 1);

        // Inside the +/-0.1 window: served from the slot
        let cached = estimator.correction_factor(20.05, 33.05);
        assert_eq!(cached, first);
        assert_eq!(estimator.recompute_count(), 1);
    }

    #[test]
    fn correction_cache_misses_outside_tolerance() {
        let mut estimator = GasConcentrationEstimator::new();

        estimator.correction_factor(20.0, 33.0);
        let fresh = estimator.correction_factor(25.0, 40.0);
        assert_eq!(estimator.recompute_count(), 2);

        // The slot now holds the new pair
        assert_eq!(estimator.correction_factor(25.0, 40.0), fresh);
        assert_eq!(estimator.recompute_count(), 2);
    }

    #[test]
    fn clear_cache_forces_recompute() {
        let mut estimator = GasConcentrationEstimator::new();
        estimator.correction_factor(20.0, 33.0);
        estimator.clear_cache();
        estimator.correction_factor(20.0, 33.0);
        assert_eq!(estimator.recompute_count(), 2);
    }

    #[test]
    fn correction_factor_at_reference_conditions() {
        let mut estimator = GasConcentrationEstimator::new();
        // At 20 C / 33% RH the humidity term vanishes
        let factor = estimator.correction_factor(20.0, REFERENCE_HUMIDITY_PCT);
        let expected = CORA * 400.0 - CORB * 20.0 + CORC;
        assert!((factor - expected).abs() < 1e-6);
    }

    #[test]
    fn ppm_at_calibration_resistance_is_atmospheric() {
        let table = GasTable::new();
        let profile = table.profile(GasKind::Co2);
        // Rs = R0 means (Rs/R0)^(-B) = 1, so ppm = A
        let ppm = profile.ppm_at(CO2_R0_OHM);
        assert!((ppm - CO2_A).abs() < 0.01, "ppm = {ppm}");
    }

    #[test]
    fn higher_resistance_means_lower_co2() {
        let table = GasTable::new();
        let profile = table.profile(GasKind::Co2);
        assert!(profile.ppm_at(2_000.0) < profile.ppm_at(500.0));
    }

    #[test]
    fn infinite_resistance_maps_to_zero_ppm() {
        let table = GasTable::new();
        let ppm = table.profile(GasKind::Co2).ppm_at(f32::INFINITY);
        assert_eq!(ppm, 0.0);
    }

    #[test]
    fn calibration_r0_round_trips_through_curve() {
        let table = GasTable::new();
        let profile = table.profile(GasKind::Co2);
        // Derive R0 from a clean-air Rs, then confirm that Rs at that R0
        // reads atmospheric
        let r0 = profile.calibration_r0(1_200.0);
        let check = GasProfile::new(GasKind::Co2, CO2_A, CO2_B, CO2_ATM_PPM, r0);
        let ppm = check.ppm_at(1_200.0);
        assert!((ppm - CO2_ATM_PPM).abs() / CO2_ATM_PPM < 0.001, "ppm = {ppm}");
    }

    #[test]
    fn no_gas_channel_reports_absent() {
        assert_eq!(NoGas.sample_ppm(20.0, 33.0), None);
    }

    #[test]
    fn mq_channel_produces_ppm_for_sane_voltage() {
        let adc = ScriptedAdc::constant(2_500);
        let mut channel = MqGasChannel::new(GasKind::Co2, adc, UnitCalibration, NoDelay);
        let ppm = channel.sample_ppm(20.0, 33.0).unwrap();
        assert!(ppm > 0.0 && ppm.is_finite(), "ppm = {ppm}");
    }

    #[test]
    fn mq_channel_rejects_dead_line() {
        let adc = ScriptedAdc::constant(0);
        let mut channel = MqGasChannel::new(GasKind::Co2, adc, UnitCalibration, NoDelay);
        assert_eq!(channel.sample_ppm(20.0, 33.0), None);
    }
}
