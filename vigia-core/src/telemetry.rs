//! Periodic Telemetry Cycle
//!
//! ## Overview
//!
//! The cycle runs once per configured period and walks three phases:
//!
//! 1. **Acquire**: read the single-wire climate sensor, drain the sound
//!    aggregator, and (when a gas channel is fitted) sample the gas
//!    estimator under the measured ambient conditions.
//! 2. **Format**: assemble a [`TelemetryRecord`] and render the wire text.
//! 3. **Encode**: seal the text and hand it to the delivery sink.
//!
//! ## Degradation policy
//!
//! A failed channel never skips the period. A decode failure or a sound
//! consolidation timeout contributes zeros; a missing gas channel simply
//! leaves the estimate absent. Only a sealing failure drops the record,
//! because a record must never leave the node unencrypted. Sink failures
//! are logged and reported in the outcome; retry policy belongs to the
//! sink, not the cycle.

use crate::constants::record::{KEY_LEN, NONCE_LEN};
use crate::encode::RecordEncoder;
use crate::errors::SetupError;
use crate::gas::GasChannel;
use crate::record::TelemetryRecord;
use crate::singlewire::{EdgeCapture, SensorFrame, SingleWireSensor};
use crate::sound::SoundEventAggregator;
use crate::time::{DelayMs, TimeSource};

use rand::RngCore;

/// Ambient conditions assumed when the climate read failed this period.
/// Matches the gas sensor's calibration point.
const FALLBACK_TEMPERATURE_C: f32 = 20.0;
const FALLBACK_HUMIDITY_PCT: f32 = crate::constants::gas::REFERENCE_HUMIDITY_PCT;

/// Validated cycle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    sample_rate_minutes: u32,
}

impl CycleConfig {
    /// Validate a sampling interval; zero is rejected at setup time
    pub fn new(sample_rate_minutes: u32) -> Result<Self, SetupError> {
        if sample_rate_minutes == 0 {
            return Err(SetupError::InvalidSampleRate { minutes: 0 });
        }
        Ok(Self { sample_rate_minutes })
    }

    /// Configured interval in minutes
    pub fn sample_rate_minutes(&self) -> u32 {
        self.sample_rate_minutes
    }

    /// Configured interval in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.sample_rate_minutes as u64 * 60_000
    }
}

/// Provisioned node settings
///
/// Implemented over whatever holds the deployment's configuration: NVS
/// partition, settings file, or a test fixture.
pub trait ConfigSource {
    /// Sampling interval in minutes
    fn sample_rate_minutes(&self) -> u32;

    /// Pre-provisioned record sealing key
    fn record_key(&self) -> [u8; KEY_LEN];
}

/// Delivery seam for sealed records
///
/// The cycle hands over the nonce and sealed text; transport, queuing, and
/// retries live behind this trait.
pub trait RecordSink {
    /// Transport-specific delivery failure
    type Error;

    /// Deliver one sealed record
    fn deliver(&mut self, nonce: &[u8; NONCE_LEN], text: &str) -> Result<(), Self::Error>;
}

/// What happened during one period, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodOutcome {
    /// The record assembled this period
    pub record: TelemetryRecord,
    /// Whether the climate frame decoded
    pub frame_ok: bool,
    /// Whether the sound drain beat its deadline
    pub sound_ok: bool,
    /// Whether the record was sealed
    pub sealed: bool,
    /// Whether the sink accepted the sealed record
    pub delivered: bool,
}

/// The node's periodic measurement loop
pub struct TelemetryCycle<'a, C, G, S, R> {
    sensor: SingleWireSensor<C>,
    sound: &'a SoundEventAggregator,
    gas: G,
    encoder: RecordEncoder<R>,
    sink: S,
    config: CycleConfig,
}

#[cfg(feature = "std")]
impl<'a, C, G, S> TelemetryCycle<'a, C, G, S, rand::rngs::OsRng>
where
    C: EdgeCapture,
    G: GasChannel,
    S: RecordSink,
{
    /// Wire up a cycle from a provisioned configuration store.
    ///
    /// Validates the sampling interval and derives the encoder from the
    /// stored key, drawing nonces from the OS entropy pool. Embedded
    /// builds construct the encoder over their hardware RNG and use
    /// [`new`](Self::new) instead.
    pub fn from_config(
        sensor: SingleWireSensor<C>,
        sound: &'a SoundEventAggregator,
        gas: G,
        sink: S,
        source: &dyn ConfigSource,
    ) -> Result<Self, SetupError> {
        let config = CycleConfig::new(source.sample_rate_minutes())?;
        let encoder = RecordEncoder::new(source.record_key());
        Ok(Self::new(sensor, sound, gas, encoder, sink, config))
    }
}

impl<'a, C, G, S, R> TelemetryCycle<'a, C, G, S, R>
where
    C: EdgeCapture,
    G: GasChannel,
    S: RecordSink,
    R: RngCore,
{
    /// Wire up one cycle over its channels, encoder, and sink
    pub fn new(
        sensor: SingleWireSensor<C>,
        sound: &'a SoundEventAggregator,
        gas: G,
        encoder: RecordEncoder<R>,
        sink: S,
        config: CycleConfig,
    ) -> Self {
        Self {
            sensor,
            sound,
            gas,
            encoder,
            sink,
            config,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Run one period: acquire, format, encode, deliver.
    ///
    /// Never fails; the outcome reports which channels degraded.
    pub fn run_once(&mut self, clock: &dyn TimeSource) -> PeriodOutcome {
        // Acquire
        let frame: Option<SensorFrame> = match self.sensor.read() {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("climate read failed, zero-filling period: {}", err);
                None
            }
        };

        let sound = self.sound.consolidate(clock);
        if sound.is_none() {
            log::warn!("sound drain timed out, zero-filling period");
        }

        let (temperature, humidity) = match &frame {
            Some(f) => (f.temperature_celsius(), f.humidity_percent()),
            None => (FALLBACK_TEMPERATURE_C, FALLBACK_HUMIDITY_PCT),
        };
        let gas_ppm = self.gas.sample_ppm(temperature, humidity);

        // Format
        let record = TelemetryRecord::from_parts(frame.as_ref(), sound.as_ref(), gas_ppm);
        let text = record.format();

        // Encode and deliver
        let (sealed, delivered) = match self.encoder.seal(text.as_bytes()) {
            Ok(sealed) => {
                let delivered = match self.sink.deliver(&sealed.nonce, &sealed.text) {
                    Ok(()) => true,
                    Err(_) => {
                        log::error!("record delivery failed");
                        false
                    }
                };
                (true, delivered)
            }
            Err(err) => {
                log::error!("record sealing failed, dropping period: {}", err);
                (false, false)
            }
        };

        log::info!(
            "period complete: frame_ok={} sound_ok={} sealed={} delivered={}",
            frame.is_some(),
            sound.is_some(),
            sealed,
            delivered,
        );

        PeriodOutcome {
            record,
            frame_ok: frame.is_some(),
            sound_ok: sound.is_some(),
            sealed,
            delivered,
        }
    }

    /// Run forever at the configured period.
    ///
    /// The delay seam takes `u32` milliseconds, so long periods are slept
    /// in chunks.
    pub fn run(&mut self, clock: &dyn TimeSource, delay: &mut dyn DelayMs) -> ! {
        loop {
            self.run_once(clock);
            let mut remaining = self.config.period_ms();
            while remaining > 0 {
                let chunk = remaining.min(u32::MAX as u64) as u32;
                delay.delay_ms(chunk);
                remaining -= chunk as u64;
            }
        }
    }
}
