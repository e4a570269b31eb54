//! Zero-phase Butterworth bandpass filtering
//!
//! The bandpass is a cascade of second-order sections: `order / 2` highpass
//! biquads at the low cutoff followed by `order / 2` lowpass biquads at the
//! high cutoff, each designed with the bilinear transform. Filtering runs
//! forward and then backward over an odd-reflected extension of the signal,
//! with every section started from its steady-state response to the edge
//! value.

use crate::config::FilterParams;
use eeg_core::{EegError, EegResult, SignalMatrix};
use std::f64::consts::PI;
use tracing::debug;

/// Single biquad section (2nd order), transposed direct form II
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadSection {
    // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadSection {
    fn design(cutoff: f64, fs: f64, q: f64, highpass: bool) -> Self {
        let omega = 2.0 * PI * cutoff / fs;
        let (sin, cos) = omega.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;

        let (b0, b1) = if highpass {
            ((1.0 + cos) / 2.0, -(1.0 + cos))
        } else {
            ((1.0 - cos) / 2.0, 1.0 - cos)
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b0 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Lowpass section with quality factor `q`
    pub fn lowpass(cutoff: f64, fs: f64, q: f64) -> Self {
        Self::design(cutoff, fs, q, false)
    }

    /// Highpass section with quality factor `q`
    pub fn highpass(cutoff: f64, fs: f64, q: f64) -> Self {
        Self::design(cutoff, fs, q, true)
    }

    /// Gain at 0 Hz
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Filter `data` in place, starting as if a constant `level` had been applied forever
    fn run(&self, data: &mut [f64], level: f64) {
        let gain = self.dc_gain();
        let mut z1 = (gain - self.b0) * level;
        let mut z2 = (self.b2 - self.a2 * gain) * level;

        for x in data.iter_mut() {
            let input = *x;
            let output = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * output + z2;
            z2 = self.b2 * input - self.a2 * output;
            *x = output;
        }
    }
}

/// Pole quality factors of an even-order Butterworth prototype
fn butterworth_q(order: usize) -> Vec<f64> {
    (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            1.0 / (2.0 * theta.cos())
        })
        .collect()
}

/// Butterworth bandpass designed for one sample rate
#[derive(Debug, Clone)]
pub struct ButterworthBandpass {
    sections: Vec<BiquadSection>,
    pub low_hz: f64,
    pub high_hz: f64,
    pub sample_rate: f64,
}

impl ButterworthBandpass {
    /// Design the cascade, refusing cutoffs that violate ordering or Nyquist
    pub fn design(params: &FilterParams, sample_rate: f64) -> EegResult<Self> {
        params.validate()?;
        params.check_nyquist(sample_rate)?;

        let qs = butterworth_q(params.order);
        let sections = qs
            .iter()
            .map(|&q| BiquadSection::highpass(params.low_hz, sample_rate, q))
            .chain(qs.iter().map(|&q| BiquadSection::lowpass(params.high_hz, sample_rate, q)))
            .collect();

        Ok(ButterworthBandpass {
            sections,
            low_hz: params.low_hz,
            high_hz: params.high_hz,
            sample_rate,
        })
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    /// Samples of odd reflection added to each end before filtering
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Single causal pass through every section
    fn forward(&self, data: &mut [f64]) {
        let mut level = data.first().copied().unwrap_or(0.0);
        for section in &self.sections {
            section.run(data, level);
            level *= section.dc_gain();
        }
    }

    /// Zero-phase forward-backward filtering of one channel
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }
        let pad = self.pad_len().min(n - 1);
        let first = signal[0];
        let last = signal[n - 1];

        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.forward(&mut ext);
        ext.reverse();
        self.forward(&mut ext);
        ext.reverse();

        ext[pad..pad + n].to_vec()
    }

    /// Magnitude response at `freq` Hz for one pass of the cascade
    pub fn magnitude_at(&self, freq: f64) -> f64 {
        let w = 2.0 * PI * freq / self.sample_rate;
        self.sections
            .iter()
            .map(|s| {
                let (c1, s1) = (w.cos(), w.sin());
                let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());
                let num_re = s.b0 + s.b1 * c1 + s.b2 * c2;
                let num_im = -(s.b1 * s1 + s.b2 * s2);
                let den_re = 1.0 + s.a1 * c1 + s.a2 * c2;
                let den_im = -(s.a1 * s1 + s.a2 * s2);
                ((num_re.powi(2) + num_im.powi(2)) / (den_re.powi(2) + den_im.powi(2))).sqrt()
            })
            .product()
    }
}

/// Zero-phase bandpass of every channel with the given filter parameters
pub fn bandpass_with(matrix: &SignalMatrix, params: &FilterParams) -> EegResult<SignalMatrix> {
    let filter = ButterworthBandpass::design(params, matrix.sample_rate())?;
    debug!(
        low_hz = params.low_hz,
        high_hz = params.high_hz,
        order = params.order,
        sections = filter.sections().len(),
        "bandpass filtering"
    );
    let rows = matrix.rows().iter().map(|row| filter.filtfilt(row)).collect();
    matrix.with_samples(rows)
}

/// Zero-phase bandpass with the default filter order
pub fn bandpass(matrix: &SignalMatrix, low_hz: f64, high_hz: f64) -> EegResult<SignalMatrix> {
    if !(low_hz.is_finite() && high_hz.is_finite()) {
        return Err(EegError::invalid("filter.low_hz", "cutoffs must be finite"));
    }
    let params = FilterParams {
        low_hz,
        high_hz,
        ..FilterParams::default()
    };
    bandpass_with(matrix, &params)
}
