//! Container encoding for resampled recordings
//!
//! Writes a [`SignalMatrix`] as EDF (European Data Format): a fixed ASCII
//! header followed by 16-bit data records, one logical signal per channel.
//! Reference: <https://www.edfplus.info/specs/edf.html>

use crate::eeg_types::PHYSICAL_UNIT;
use crate::error::{EegError, EegResult};
use crate::signal_matrix::{ChannelStats, SignalMatrix};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

const DIGITAL_MIN: i32 = -32768;
const DIGITAL_MAX: i32 = 32767;

/// Header bytes that precede the per-signal headers
pub const EDF_MAIN_HEADER_BYTES: usize = 256;
/// Header bytes contributed by each signal
pub const EDF_SIGNAL_HEADER_BYTES: usize = 256;

/// Writer for one container format
pub trait FormatWriter {
    /// Human-readable format name
    fn format_name(&self) -> &'static str;

    /// File extension without the leading dot
    fn default_extension(&self) -> &'static str;

    /// Encode the matrix into any byte sink
    fn write_to<W: Write>(&self, matrix: &SignalMatrix, writer: &mut W) -> EegResult<()>;

    /// Encode the matrix into a file, creating or truncating it
    fn write(&self, matrix: &SignalMatrix, path: &Path) -> EegResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(matrix, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Physical-to-digital calibration of one signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub physical_min: f64,
    pub physical_max: f64,
}

impl Calibration {
    /// Data range widened by 10% of its span; flat signals get +/-1 uV around their level
    pub fn for_channel(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self { physical_min: -1.0, physical_max: 1.0 };
        }
        let stats = ChannelStats::calculate(data);
        let span = stats.peak_to_peak;
        if span > 0.0 {
            Self {
                physical_min: stats.min - span * 0.1,
                physical_max: stats.max + span * 0.1,
            }
        } else {
            Self {
                physical_min: stats.min - 1.0,
                physical_max: stats.max + 1.0,
            }
        }
    }

    fn gain(&self) -> f64 {
        (self.physical_max - self.physical_min) / f64::from(DIGITAL_MAX - DIGITAL_MIN)
    }

    /// Quantize a physical value to the digital range
    pub fn to_digital(&self, value: f64) -> i16 {
        let offset = self.physical_max - self.gain() * f64::from(DIGITAL_MAX);
        let digital = ((value - offset) / self.gain()).round();
        digital.clamp(f64::from(DIGITAL_MIN), f64::from(DIGITAL_MAX)) as i16
    }

    /// Map a digital value back to physical units
    pub fn to_physical(&self, digital: i16) -> f64 {
        let offset = self.physical_max - self.gain() * f64::from(DIGITAL_MAX);
        f64::from(digital) * self.gain() + offset
    }
}

/// EDF encoder with one-second data records
#[derive(Debug, Clone, Copy, Default)]
pub struct EdfWriter;

impl EdfWriter {
    pub fn new() -> Self {
        Self
    }

    fn write_fixed_string<W: Write>(writer: &mut W, s: &str, size: usize) -> EegResult<()> {
        let mut buffer = vec![b' '; size];
        let bytes = s.as_bytes();
        let copy_len = bytes.len().min(size);
        buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Format a number into at most `size` characters
    fn fixed_number(value: f64, size: usize) -> String {
        let mut text = format!("{}", value);
        if text.len() > size {
            let integer_digits = format!("{:.0}", value).len();
            let decimals = size.saturating_sub(integer_digits + 1);
            text = format!("{:.*}", decimals, value);
            text.truncate(size);
        }
        text
    }

    /// EDF start date and time (`dd.mm.yy`, `hh.mm.ss`)
    fn start_fields(start_ms: f64) -> (String, String) {
        // Only timestamps in a plausible Unix-millisecond range are treated as wall-clock time
        let wall_clock = (1.0e11..1.0e14).contains(&start_ms);
        match DateTime::<Utc>::from_timestamp_millis(start_ms as i64).filter(|_| wall_clock) {
            Some(dt) => (
                format!("{:02}.{:02}.{:02}", dt.day(), dt.month(), dt.year() % 100),
                format!("{:02}.{:02}.{:02}", dt.hour(), dt.minute(), dt.second()),
            ),
            None => ("01.01.85".to_string(), "00.00.00".to_string()),
        }
    }

    /// Samples per data record and record duration in seconds
    fn record_layout(sample_rate: f64) -> (usize, f64) {
        let samples_per_record = sample_rate.round().max(1.0) as usize;
        (samples_per_record, samples_per_record as f64 / sample_rate)
    }

    fn write_header<W: Write>(
        writer: &mut W,
        matrix: &SignalMatrix,
        calibrations: &[Calibration],
        samples_per_record: usize,
        record_duration: f64,
        num_records: usize,
    ) -> EegResult<()> {
        let num_signals = matrix.channel_count();
        let header_bytes = EDF_MAIN_HEADER_BYTES + num_signals * EDF_SIGNAL_HEADER_BYTES;
        let (date, time) = Self::start_fields(matrix.start_ms());

        Self::write_fixed_string(writer, "0", 8)?;
        Self::write_fixed_string(writer, "X X X X", 80)?;
        Self::write_fixed_string(writer, &format!("Startdate X X X eegpipe {}", matrix.id), 80)?;
        Self::write_fixed_string(writer, &date, 8)?;
        Self::write_fixed_string(writer, &time, 8)?;
        Self::write_fixed_string(writer, &header_bytes.to_string(), 8)?;
        Self::write_fixed_string(writer, "", 44)?;
        Self::write_fixed_string(writer, &num_records.to_string(), 8)?;
        Self::write_fixed_string(writer, &Self::fixed_number(record_duration, 8), 8)?;
        Self::write_fixed_string(writer, &num_signals.to_string(), 4)?;

        // Signal headers are stored field by field across all signals
        for electrode in matrix.channels() {
            Self::write_fixed_string(writer, electrode.label(), 16)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, "AgAgCl electrode", 80)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, PHYSICAL_UNIT, 8)?;
        }
        for cal in calibrations {
            Self::write_fixed_string(writer, &Self::fixed_number(cal.physical_min, 8), 8)?;
        }
        for cal in calibrations {
            Self::write_fixed_string(writer, &Self::fixed_number(cal.physical_max, 8), 8)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, &DIGITAL_MIN.to_string(), 8)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, &DIGITAL_MAX.to_string(), 8)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, "", 80)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, &samples_per_record.to_string(), 8)?;
        }
        for _ in matrix.channels() {
            Self::write_fixed_string(writer, "", 32)?;
        }
        Ok(())
    }
}

impl FormatWriter for EdfWriter {
    fn format_name(&self) -> &'static str {
        "EDF"
    }

    fn default_extension(&self) -> &'static str {
        "edf"
    }

    fn write_to<W: Write>(&self, matrix: &SignalMatrix, writer: &mut W) -> EegResult<()> {
        if matrix.channel_count() == 0 {
            return Err(EegError::malformed("cannot encode a recording without channels"));
        }

        let total = matrix.samples_per_channel();
        let (samples_per_record, record_duration) = Self::record_layout(matrix.sample_rate());
        let num_records = total.div_ceil(samples_per_record);
        let calibrations: Vec<Calibration> =
            matrix.rows().iter().map(|row| Calibration::for_channel(row)).collect();

        debug!(
            signals = matrix.channel_count(),
            records = num_records,
            samples_per_record,
            "writing EDF container"
        );

        Self::write_header(
            writer,
            matrix,
            &calibrations,
            samples_per_record,
            record_duration,
            num_records,
        )?;

        let mut record = Vec::with_capacity(samples_per_record * 2);
        for rec in 0..num_records {
            let start = rec * samples_per_record;
            for (row, cal) in matrix.rows().iter().zip(&calibrations) {
                record.clear();
                for i in start..start + samples_per_record {
                    // The trailing partial record is zero-padded
                    let digital = row.get(i).map_or(0, |&v| cal.to_digital(v));
                    record.extend_from_slice(&digital.to_le_bytes());
                }
                writer.write_all(&record)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eeg_types::Electrode;
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    fn field(bytes: &[u8], offset: usize, len: usize) -> String {
        String::from_utf8_lossy(&bytes[offset..offset + len]).trim().to_string()
    }

    fn matrix(n: usize) -> SignalMatrix {
        let af7: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin() * 50.0).collect();
        let af8: Vec<f64> = (0..n).map(|i| (i as f64 * 0.05).cos() * 20.0).collect();
        SignalMatrix::new(256.0, vec![Electrode::AF7, Electrode::AF8], vec![af7, af8], 0.0).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let m = matrix(256 * 3 + 100);
        let mut bytes = Vec::new();
        EdfWriter::new().write_to(&m, &mut bytes).unwrap();

        assert_eq!(field(&bytes, 0, 8), "0");
        assert_eq!(field(&bytes, 168, 8), "01.01.85");
        assert_eq!(field(&bytes, 184, 8), "768");
        assert_eq!(field(&bytes, 236, 8), "4");
        assert_eq!(field(&bytes, 244, 8), "1");
        assert_eq!(field(&bytes, 252, 4), "2");

        // Labels, then units after the 80-byte transducer fields
        assert_eq!(field(&bytes, 256, 16), "AF7");
        assert_eq!(field(&bytes, 272, 16), "AF8");
        let units = 256 + 2 * 16 + 2 * 80;
        assert_eq!(field(&bytes, units, 8), "uV");

        // Header plus four 1-second records of two 256-sample signals
        assert_eq!(bytes.len(), 768 + 4 * 2 * 256 * 2);
    }

    #[test]
    fn test_samples_round_trip_within_quantization() {
        let m = matrix(512);
        let mut bytes = Vec::new();
        EdfWriter::new().write_to(&m, &mut bytes).unwrap();

        let cal = Calibration::for_channel(&m.rows()[0]);
        let data = &bytes[768..];
        for i in [0usize, 17, 255] {
            let digital = i16::from_le_bytes([data[2 * i], data[2 * i + 1]]);
            assert_abs_diff_eq!(cal.to_physical(digital), m.rows()[0][i], epsilon = 0.01);
        }
    }

    #[test]
    fn test_partial_record_is_zero_padded() {
        let m = matrix(300);
        let mut bytes = Vec::new();
        EdfWriter::new().write_to(&m, &mut bytes).unwrap();
        // Second record, first signal, sample index 44 lies past the end of the data
        let offset = 768 + 2 * 256 * 2 + 2 * 44;
        assert_eq!(i16::from_le_bytes([bytes[offset], bytes[offset + 1]]), 0);
    }

    #[test]
    fn test_flat_channel_calibration() {
        let cal = Calibration::for_channel(&[3.0; 10]);
        assert_eq!(cal.physical_min, 2.0);
        assert_eq!(cal.physical_max, 4.0);
        assert_abs_diff_eq!(cal.to_physical(cal.to_digital(3.0)), 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_wall_clock_start_date() {
        // 2024-03-05 14:30:15 UTC
        let (date, time) = EdfWriter::start_fields(1_709_649_015_000.0);
        assert_eq!(date, "05.03.24");
        assert_eq!(time, "14.30.15");
    }

    #[test]
    fn test_write_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recording.edf");
        EdfWriter::new().write(&matrix(256), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 768 + 2 * 256 * 2);
    }

    #[test]
    fn test_fixed_number_fits_field() {
        assert_eq!(EdfWriter::fixed_number(1.0, 8), "1");
        assert!(EdfWriter::fixed_number(-1234.56789123, 8).len() <= 8);
        assert!(EdfWriter::fixed_number(0.99609375, 8).len() <= 8);
    }
}
