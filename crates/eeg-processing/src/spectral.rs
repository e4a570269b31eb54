//! Welch power spectral density estimation
//!
//! Each epoch channel is cut into sub-windows of `window_s` seconds whose
//! starts are `window_s - overlap_s` apart. Every sub-window is mean-removed,
//! tapered and transformed; the one-sided periodograms are averaged and scaled
//! to a density in uV^2/Hz:
//!
//! ```text
//! P[k] = c_k * |X[k]|^2 / (fs * sum(w^2))
//! ```
//!
//! where `c_k` is 2 for every bin except DC and (for even lengths) Nyquist.

use crate::config::WelchParams;
use eeg_core::{EegError, EegResult, Electrode, Epoch};
use num_complex::Complex64;
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

/// Tapering window applied to each sub-window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taper {
    Hann,
    #[default]
    Hamming,
}

impl Taper {
    /// Periodic (DFT-even) window of length `n`
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        let (a0, a1) = match self {
            Taper::Hann => (0.5, 0.5),
            Taper::Hamming => (0.54, 0.46),
        };
        (0..n)
            .map(|i| a0 - a1 * (2.0 * PI * i as f64 / n as f64).cos())
            .collect()
    }
}

/// Spectrum of one (epoch, channel) pair
#[derive(Debug, Clone, PartialEq)]
pub struct PsdRecord {
    pub channel: Electrode,
    /// Ascending bin frequencies in Hz
    pub frequencies: Vec<f64>,
    /// Power density in uV^2/Hz, same length as `frequencies`
    pub power: Vec<f64>,
}

impl PsdRecord {
    /// Spacing between adjacent bins in Hz
    pub fn resolution(&self) -> f64 {
        match self.frequencies.as_slice() {
            [a, b, ..] => b - a,
            _ => f64::NAN,
        }
    }

    /// Frequency of the largest power bin
    pub fn peak_frequency(&self) -> Option<f64> {
        self.power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }
}

/// Welch estimator planned for one sample rate and window length
pub struct WelchEstimator {
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    window_power: f64,
    segment_len: usize,
    step: usize,
    sample_rate: f64,
    fmin_hz: f64,
    fmax_hz: f64,
}

impl WelchEstimator {
    pub fn new(params: &WelchParams, sample_rate: f64) -> EegResult<Self> {
        let segment_len = (params.window_s * sample_rate).round() as usize;
        if segment_len < 2 {
            return Err(EegError::invalid("welch.window_s", "shorter than two samples"));
        }
        let overlap = (params.overlap_s * sample_rate).round() as usize;
        if overlap >= segment_len {
            return Err(EegError::invalid("welch.overlap_s", "must be shorter than welch.window_s"));
        }

        let window = params.taper.coefficients(segment_len);
        let window_power = window.iter().map(|w| w * w).sum();
        let fft = RealFftPlanner::<f64>::new().plan_fft_forward(segment_len);

        Ok(WelchEstimator {
            fft,
            window,
            window_power,
            segment_len,
            step: segment_len - overlap,
            sample_rate,
            fmin_hz: params.fmin_hz,
            fmax_hz: params.fmax_hz,
        })
    }

    /// Samples in each sub-window
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Bin spacing in Hz
    pub fn resolution(&self) -> f64 {
        self.sample_rate / self.segment_len as f64
    }

    /// Bins inside `[fmin_hz, fmax_hz]`
    fn bin_range(&self) -> (usize, usize) {
        let df = self.resolution();
        let nyquist_bin = self.segment_len / 2;
        let first = ((self.fmin_hz / df) - 1e-9).ceil().max(0.0) as usize;
        let last = ((self.fmax_hz / df) + 1e-9).floor() as usize;
        (first, last.min(nyquist_bin))
    }

    /// Density spectrum of one channel, restricted to the configured band
    pub fn estimate(&self, signal: &[f64]) -> EegResult<(Vec<f64>, Vec<f64>)> {
        if signal.len() < self.segment_len {
            return Err(EegError::InsufficientData {
                required: self.segment_len,
                available: signal.len(),
            });
        }

        let bins = self.segment_len / 2 + 1;
        let mut input = self.fft.make_input_vec();
        let mut spectrum = vec![Complex64::new(0.0, 0.0); bins];
        let mut accumulated = vec![0.0; bins];
        let mut segments = 0usize;

        let mut start = 0;
        while start + self.segment_len <= signal.len() {
            let segment = &signal[start..start + self.segment_len];
            let mean = segment.iter().sum::<f64>() / self.segment_len as f64;
            for ((dst, &x), &w) in input.iter_mut().zip(segment).zip(&self.window) {
                *dst = (x - mean) * w;
            }
            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| EegError::malformed(format!("FFT failed: {}", e)))?;
            for (acc, c) in accumulated.iter_mut().zip(&spectrum) {
                *acc += c.norm_sqr();
            }
            segments += 1;
            start += self.step;
        }

        let scale = 1.0 / (self.sample_rate * self.window_power * segments as f64);
        let nyquist_bin = (self.segment_len % 2 == 0).then_some(self.segment_len / 2);
        let (first, last) = self.bin_range();
        let df = self.resolution();

        let frequencies = (first..=last).map(|k| k as f64 * df).collect();
        let power = (first..=last)
            .map(|k| {
                let one_sided = if k == 0 || Some(k) == nyquist_bin { 1.0 } else { 2.0 };
                accumulated[k] * scale * one_sided
            })
            .collect();
        Ok((frequencies, power))
    }

    /// One record per channel of the epoch
    pub fn epoch_psd(&self, epoch: &Epoch) -> EegResult<Vec<PsdRecord>> {
        epoch
            .channels
            .iter()
            .zip(&epoch.samples)
            .map(|(&channel, row)| {
                let (frequencies, power) = self.estimate(row)?;
                Ok(PsdRecord { channel, frequencies, power })
            })
            .collect()
    }
}

/// Welch PSD of every channel of an epoch, with the default taper and 1-40 Hz range
pub fn welch_psd(epoch: &Epoch, window_s: f64, overlap_s: f64) -> EegResult<Vec<PsdRecord>> {
    let params = WelchParams {
        window_s,
        overlap_s,
        ..WelchParams::default()
    };
    WelchEstimator::new(&params, epoch.sample_rate)?.epoch_psd(epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn epoch_of(rows: Vec<Vec<f64>>, fs: f64) -> Epoch {
        Epoch {
            index: 0,
            start_sample: 0,
            start_time_s: 0.0,
            sample_rate: fs,
            channels: Electrode::ALL[..rows.len()].to_vec(),
            samples: rows,
        }
    }

    fn sine(freq: f64, amplitude: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_frequency_axis() {
        let epoch = epoch_of(vec![sine(10.0, 5.0, 256.0, 512)], 256.0);
        let records = welch_psd(&epoch, 2.0, 1.0).unwrap();
        let psd = &records[0];
        assert_eq!(psd.channel, Electrode::TP9);
        assert_eq!(psd.resolution(), 0.5);
        assert_eq!(psd.frequencies.first().copied(), Some(1.0));
        assert_eq!(psd.frequencies.last().copied(), Some(40.0));
        assert_eq!(psd.frequencies.len(), 79);
        assert_eq!(psd.power.len(), psd.frequencies.len());
    }

    #[test]
    fn test_sine_peak_and_total_power() {
        let fs = 256.0;
        let epoch = epoch_of(vec![sine(10.0, 5.0, fs, 2048)], fs);
        let psd = &welch_psd(&epoch, 2.0, 1.0).unwrap()[0];
        assert_eq!(psd.peak_frequency(), Some(10.0));

        // Integrated density equals the sine's power A^2 / 2
        let total: f64 = psd.power.iter().sum::<f64>() * psd.resolution();
        assert_relative_eq!(total, 12.5, max_relative = 0.01);
    }

    #[test]
    fn test_white_noise_level() {
        // Deterministic uniform noise with unit variance
        let fs = 256.0;
        let mut state = 12345u64;
        let noise: Vec<f64> = (0..4096)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 12f64.sqrt()
            })
            .collect();
        let psd = &welch_psd(&epoch_of(vec![noise], fs), 2.0, 1.0).unwrap()[0];
        let mean_density = psd.power.iter().sum::<f64>() / psd.power.len() as f64;
        // One-sided density of unit-variance white noise is 2 / fs
        assert_relative_eq!(mean_density, 2.0 / fs, max_relative = 0.25);
    }

    #[test]
    fn test_hann_and_hamming_agree_on_peak() {
        let fs = 256.0;
        let signal = sine(12.0, 3.0, fs, 1024);
        for taper in [Taper::Hann, Taper::Hamming] {
            let params = WelchParams { taper, ..WelchParams::default() };
            let estimator = WelchEstimator::new(&params, fs).unwrap();
            let (freqs, power) = estimator.estimate(&signal).unwrap();
            let peak = power.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1)).unwrap().0;
            assert_eq!(freqs[peak], 12.0);
        }
    }

    #[test]
    fn test_epoch_shorter_than_window() {
        let epoch = epoch_of(vec![sine(10.0, 1.0, 256.0, 300)], 256.0);
        let err = welch_psd(&epoch, 2.0, 1.0).unwrap_err();
        assert!(matches!(err, EegError::InsufficientData { required: 512, available: 300 }));
    }

    #[test]
    fn test_invalid_overlap() {
        let params = WelchParams { overlap_s: 2.0, ..WelchParams::default() };
        assert!(matches!(
            WelchEstimator::new(&params, 256.0),
            Err(EegError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_periodic_taper() {
        let w = Taper::Hann.coefficients(4);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[2], 1.0);
        let h = Taper::Hamming.coefficients(4);
        assert_relative_eq!(h[0], 0.08);
    }
}
