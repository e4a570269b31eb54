//! SignalMatrix: uniformly sampled multi-channel EEG

use crate::eeg_types::Electrode;
use crate::error::{EegError, EegResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uniform-rate signal, stored channel-major (`samples[channel][time_index]`)
#[derive(Debug, Clone)]
pub struct SignalMatrix {
    /// Unique identifier, carried through logs and reports
    pub id: Uuid,
    /// Sampling rate in Hz, constant for the whole matrix
    sample_rate: f64,
    /// Electrode of each row
    channels: Vec<Electrode>,
    /// Voltages in microvolts
    samples: Vec<Vec<f64>>,
    /// Timestamp of the first sample in milliseconds
    start_ms: f64,
}

impl SignalMatrix {
    /// Create a new matrix, checking that every channel has the same length
    pub fn new(
        sample_rate: f64,
        channels: Vec<Electrode>,
        samples: Vec<Vec<f64>>,
        start_ms: f64,
    ) -> EegResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EegError::invalid(
                "sample_rate",
                format!("{} Hz is not a positive rate", sample_rate),
            ));
        }
        if channels.len() != samples.len() {
            return Err(EegError::malformed(format!(
                "{} channel names for {} channel rows",
                channels.len(),
                samples.len()
            )));
        }
        if let Some(first) = samples.first() {
            let ragged = samples.iter().enumerate().find(|(_, row)| row.len() != first.len());
            if let Some((i, row)) = ragged {
                return Err(EegError::malformed(format!(
                    "channel {} has {} samples, expected {}",
                    channels[i],
                    row.len(),
                    first.len()
                )));
            }
        }

        Ok(SignalMatrix {
            id: Uuid::new_v4(),
            sample_rate,
            channels,
            samples,
            start_ms,
        })
    }

    /// Same metadata, new sample rows of identical shape
    pub fn with_samples(&self, samples: Vec<Vec<f64>>) -> EegResult<Self> {
        let expected = self.samples_per_channel();
        if samples.len() != self.channels.len() || samples.iter().any(|row| row.len() != expected) {
            return Err(EegError::malformed("replacement samples do not match the matrix shape"));
        }
        Ok(SignalMatrix {
            id: self.id,
            sample_rate: self.sample_rate,
            channels: self.channels.clone(),
            samples,
            start_ms: self.start_ms,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[Electrode] {
        &self.channels
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.samples
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    /// Get number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }

    /// Get signal duration in seconds
    pub fn duration_s(&self) -> f64 {
        self.samples_per_channel() as f64 / self.sample_rate
    }

    /// Get data for a specific electrode
    pub fn channel_data(&self, electrode: Electrode) -> EegResult<&[f64]> {
        self.channels
            .iter()
            .position(|&e| e == electrode)
            .map(|i| self.samples[i].as_slice())
            .ok_or_else(|| {
                let reason = format!("{} is not present in the recording", electrode);
                EegError::invalid("channels", reason)
            })
    }

    /// Restrict the matrix to a subset of electrodes, in the requested order
    pub fn select(&self, electrodes: &[Electrode]) -> EegResult<SignalMatrix> {
        if electrodes.is_empty() {
            return Err(EegError::invalid("channels", "at least one channel is required"));
        }
        let rows = electrodes
            .iter()
            .map(|&e| self.channel_data(e).map(<[f64]>::to_vec))
            .collect::<EegResult<Vec<_>>>()?;

        Ok(SignalMatrix {
            id: self.id,
            sample_rate: self.sample_rate,
            channels: electrodes.to_vec(),
            samples: rows,
            start_ms: self.start_ms,
        })
    }

    /// Keep only the first `seconds` of the signal
    pub fn crop(&self, seconds: f64) -> EegResult<SignalMatrix> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(EegError::invalid("max_duration_s", "must be greater than 0"));
        }
        let keep = ((seconds * self.sample_rate).round() as usize).min(self.samples_per_channel());
        Ok(SignalMatrix {
            id: self.id,
            sample_rate: self.sample_rate,
            channels: self.channels.clone(),
            samples: self.samples.iter().map(|row| row[..keep].to_vec()).collect(),
            start_ms: self.start_ms,
        })
    }
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let mean = data.iter().sum::<f64>() / data.len() as f64;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}
