//! Telemetry Record Assembly
//!
//! One record per telemetry period, assembled from whichever channels
//! produced data. The wire format is a fixed-label text rendering whose
//! labels the receiving backend matches byte-for-byte, so it is produced
//! with `core::fmt` against the exact label strings rather than a generic
//! serializer. Channels that failed this period contribute zeros; the gas
//! estimate rides along for local consumers but is never rendered into the
//! wire text.

use core::fmt::Write;

use crate::constants::record::MAX_RECORD_LEN;
use crate::singlewire::SensorFrame;
use crate::sound::SoundSummary;

/// One period's consolidated measurements
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryRecord {
    /// Sound detections this period
    pub sound_detections: u32,
    /// Longest sound detection this period (ms)
    pub sound_max_duration_ms: u32,
    /// Temperature, integral part (degrees C)
    pub temperature: u8,
    /// Temperature, decimal part
    pub temperature_decimal: u8,
    /// Relative humidity, integral part (%)
    pub humidity: u8,
    /// Relative humidity, decimal part
    pub humidity_decimal: u8,
    /// Gas concentration estimate (ppm); absent when no gas channel ran.
    /// Local-only: not part of the wire text.
    pub gas_ppm: Option<f32>,
}

impl TelemetryRecord {
    /// Assemble a record from this period's channel outputs.
    ///
    /// A channel that produced nothing (`None`) contributes zeros, so a
    /// record always exists even when every sensor failed.
    pub fn from_parts(
        frame: Option<&SensorFrame>,
        sound: Option<&SoundSummary>,
        gas_ppm: Option<f32>,
    ) -> Self {
        let (humidity, humidity_decimal, temperature, temperature_decimal) = match frame {
            Some(f) => (
                f.humidity,
                f.humidity_decimal,
                f.temperature,
                f.temperature_decimal,
            ),
            None => (0, 0, 0, 0),
        };
        let (detections, max_duration) = match sound {
            Some(s) => (s.detections, s.max_duration_ms),
            None => (0, 0),
        };
        Self {
            sound_detections: detections,
            sound_max_duration_ms: max_duration,
            temperature,
            temperature_decimal,
            humidity,
            humidity_decimal,
            gas_ppm,
        }
    }

    /// Render the wire text.
    ///
    /// The labels are a fixed contract with the backend; the decimal parts
    /// are raw sensor bytes joined with a dot, not a divided float. Worst
    /// case is well under [`MAX_RECORD_LEN`], so the write cannot fail; a
    /// formatting error would indicate a broken length bound and yields an
    /// empty string rather than a truncated record.
    pub fn format(&self) -> heapless::String<MAX_RECORD_LEN> {
        let mut out = heapless::String::new();
        let result = write!(
            out,
            "{{\"Contador de pulsos de sonido\": {}, \"Maxima duracion de pulso\": {}, \"Temperatura\": {}.{}, \"Humedad\": {}.{}}}",
            self.sound_detections,
            self.sound_max_duration_ms,
            self.temperature,
            self.temperature_decimal,
            self.humidity,
            self.humidity_decimal,
        );
        if result.is_err() {
            log::error!("record overflowed its length bound");
            out.clear();
        }
        out
    }
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self::from_parts(None, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(h: u8, hd: u8, t: u8, td: u8) -> SensorFrame {
        let bytes = [h, hd, t, td, h.wrapping_add(hd).wrapping_add(t).wrapping_add(td)];
        SensorFrame::from_bytes(bytes).unwrap()
    }

    #[test]
    fn format_matches_wire_contract() {
        let record = TelemetryRecord::from_parts(
            Some(&frame(45, 0, 23, 0)),
            Some(&SoundSummary {
                detections: 3,
                max_duration_ms: 120,
            }),
            None,
        );
        assert_eq!(
            record.format().as_str(),
            "{\"Contador de pulsos de sonido\": 3, \"Maxima duracion de pulso\": 120, \"Temperatura\": 23.0, \"Humedad\": 45.0}",
        );
    }

    #[test]
    fn missing_channels_render_as_zeros() {
        let record = TelemetryRecord::from_parts(None, None, None);
        assert_eq!(
            record.format().as_str(),
            "{\"Contador de pulsos de sonido\": 0, \"Maxima duracion de pulso\": 0, \"Temperatura\": 0.0, \"Humedad\": 0.0}",
        );
    }

    #[test]
    fn gas_estimate_never_reaches_the_wire() {
        let record = TelemetryRecord::from_parts(None, None, Some(412.7));
        assert_eq!(record.gas_ppm, Some(412.7));
        assert!(!record.format().as_str().contains("412"));
    }

    #[test]
    fn worst_case_record_fits_the_bound() {
        let record = TelemetryRecord {
            sound_detections: u32::MAX,
            sound_max_duration_ms: u32::MAX,
            temperature: u8::MAX,
            temperature_decimal: u8::MAX,
            humidity: u8::MAX,
            humidity_decimal: u8::MAX,
            gas_ppm: None,
        };
        let text = record.format();
        assert!(!text.is_empty());
        assert!(text.len() <= MAX_RECORD_LEN);
    }

    #[test]
    fn decimal_parts_are_raw_bytes_not_fractions() {
        let record = TelemetryRecord::from_parts(Some(&frame(45, 7, 23, 4)), None, None);
        let text = record.format();
        assert!(text.as_str().contains("\"Temperatura\": 23.4"));
        assert!(text.as_str().contains("\"Humedad\": 45.7"));
    }
}
