//! Synthetic four-channel recordings in the acquisition layout

use crate::signal_patterns::SignalPattern;
use eeg_core::{EegError, EegResult, Electrode, RawSample, CHANNEL_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Header row written by the acquisition application
pub const CSV_HEADER: [&str; 1 + CHANNEL_COUNT] = ["Timestamp (ms)", "TP9", "AF7", "AF8", "TP10"];

/// Configuration for recording simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Sampling rate in Hz
    pub sample_rate_hz: f64,
    pub duration_s: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Timestamps are offset by uniform noise in `[-jitter_ms, jitter_ms]`
    pub jitter_ms: f64,
    /// Unix-epoch milliseconds of the first sample
    pub start_ms: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 256.0,
            duration_s: 10.0,
            seed: 42,
            jitter_ms: 0.0,
            start_ms: 1_709_649_015_000.0,
        }
    }
}

/// Recording simulator
pub struct RecordingSimulator {
    config: SimulationConfig,
    rng: StdRng,
    patterns: [Vec<SignalPattern>; CHANNEL_COUNT],
}

impl RecordingSimulator {
    /// Create a simulator with silent channels
    pub fn new(config: SimulationConfig) -> EegResult<Self> {
        if !(config.sample_rate_hz.is_finite() && config.sample_rate_hz > 0.0) {
            return Err(EegError::invalid("sample_rate_hz", "must be positive"));
        }
        if !(config.duration_s.is_finite() && config.duration_s > 0.0) {
            return Err(EegError::invalid("duration_s", "must be positive"));
        }
        if !(config.jitter_ms.is_finite() && config.jitter_ms >= 0.0) {
            return Err(EegError::invalid("jitter_ms", "must be non-negative"));
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(RecordingSimulator {
            config,
            rng,
            patterns: Default::default(),
        })
    }

    /// 10 Hz, 5 uV alpha rhythm on every channel, optionally with a 500 uV
    /// artifact burst of half a second at `burst_at_s`
    pub fn alpha_scenario(config: SimulationConfig, burst_at_s: Option<f64>) -> EegResult<Self> {
        let mut simulator = Self::new(config)?.with_pattern(SignalPattern::alpha_rhythm());
        if let Some(start) = burst_at_s {
            simulator = simulator.with_pattern(SignalPattern::movement_artifact(start));
        }
        Ok(simulator)
    }

    /// Add a component to every channel
    pub fn with_pattern(mut self, pattern: SignalPattern) -> Self {
        for channel in self.patterns.iter_mut() {
            channel.push(pattern);
        }
        self
    }

    /// Add a component to a single channel
    pub fn with_channel_pattern(mut self, electrode: Electrode, pattern: SignalPattern) -> Self {
        self.patterns[electrode.index()].push(pattern);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Generate `duration_s * sample_rate_hz` samples
    pub fn generate(&mut self) -> Vec<RawSample> {
        let fs = self.config.sample_rate_hz;
        let count = (self.config.duration_s * fs).round() as usize;
        let interval_ms = 1000.0 / fs;
        let jitter = self.config.jitter_ms;
        let start_ms = self.config.start_ms;
        let patterns = &self.patterns;
        let rng = &mut self.rng;

        let samples: Vec<RawSample> = (0..count)
            .map(|k| {
                let time = k as f64 / fs;
                let mut channels = [0.0; CHANNEL_COUNT];
                for (value, components) in channels.iter_mut().zip(patterns) {
                    *value = components.iter().map(|p| p.value_at(time, rng)).sum();
                }
                let offset = if jitter > 0.0 { rng.gen_range(-jitter..=jitter) } else { 0.0 };
                RawSample::new(start_ms + k as f64 * interval_ms + offset, channels)
            })
            .collect();

        debug!(
            samples = samples.len(),
            sample_rate_hz = fs,
            jitter_ms = jitter,
            "simulated recording"
        );
        samples
    }
}

/// Write samples in the acquisition CSV layout
pub fn write_csv<W: Write>(samples: &[RawSample], writer: W) -> EegResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER).map_err(|e| EegError::Csv(e.to_string()))?;
    for sample in samples {
        let mut row = Vec::with_capacity(1 + CHANNEL_COUNT);
        row.push(format!("{:.3}", sample.timestamp_ms));
        row.extend(sample.channels.iter().map(|v| format!("{:.6}", v)));
        wtr.write_record(&row).map_err(|e| EegError::Csv(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file(samples: &[RawSample], path: &Path) -> EegResult<()> {
    write_csv(samples, File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_generate_length_and_timing() {
        let mut simulator =
            RecordingSimulator::alpha_scenario(SimulationConfig::default(), None).unwrap();
        let samples = simulator.generate();
        assert_eq!(samples.len(), 2560);
        let start = SimulationConfig::default().start_ms;
        assert_eq!(samples[0].timestamp_ms, start);
        assert_abs_diff_eq!(samples[256].timestamp_ms - start, 1000.0, epsilon = 1e-6);
        let expected = 5.0 * (2.0 * std::f64::consts::PI * 10.0 * 25.0 / 256.0).sin();
        assert_abs_diff_eq!(samples[25].value(Electrode::AF7), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_same_seed_same_recording() {
        let config = SimulationConfig { jitter_ms: 1.0, ..SimulationConfig::default() };
        let a = RecordingSimulator::alpha_scenario(config.clone(), Some(4.0)).unwrap().generate();
        let b = RecordingSimulator::alpha_scenario(config, Some(4.0)).unwrap().generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_jitter_bounds() {
        let config = SimulationConfig { jitter_ms: 1.0, ..SimulationConfig::default() };
        let samples = RecordingSimulator::new(config.clone()).unwrap().generate();
        for (k, s) in samples.iter().enumerate() {
            let nominal = config.start_ms + k as f64 * 1000.0 / 256.0;
            assert!((s.timestamp_ms - nominal).abs() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_channel_pattern() {
        let mut simulator = RecordingSimulator::new(SimulationConfig::default())
            .unwrap()
            .with_channel_pattern(Electrode::TP10, SignalPattern::Offset { level: 800.0 });
        let sample = simulator.generate()[10];
        assert_eq!(sample.value(Electrode::TP10), 800.0);
        assert_eq!(sample.value(Electrode::TP9), 0.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = SimulationConfig { sample_rate_hz: 0.0, ..SimulationConfig::default() };
        assert!(RecordingSimulator::new(config).is_err());
    }

    #[test]
    fn test_csv_layout() {
        let config = SimulationConfig { duration_s: 0.05, ..SimulationConfig::default() };
        let samples = RecordingSimulator::alpha_scenario(config, None)
            .unwrap()
            .generate();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeg_recording_sim.csv");
        write_csv_file(&samples, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Timestamp (ms),TP9,AF7,AF8,TP10"));
        assert_eq!(lines.count(), samples.len());
    }
}
