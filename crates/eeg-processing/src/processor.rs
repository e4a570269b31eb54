//! Numeric backend seam
//!
//! The pipeline only needs two numeric capabilities: a zero-phase bandpass
//! over a whole matrix and a per-channel PSD of one epoch. Anything that
//! implements [`SpectralBackend`] can be plugged into
//! [`Pipeline::with_backend`](crate::pipeline::Pipeline::with_backend).

use crate::config::{FilterParams, WelchParams};
use crate::filters::bandpass_with;
use crate::spectral::{PsdRecord, WelchEstimator};
use eeg_core::{EegResult, Epoch, SignalMatrix};

/// Filtering and spectral estimation used by the pipeline
pub trait SpectralBackend: Send + Sync {
    /// Get backend name/identifier
    fn name(&self) -> &str;

    /// Zero-phase bandpass of every channel; returns a new matrix of the same shape
    fn bandpass(&self, matrix: &SignalMatrix, params: &FilterParams) -> EegResult<SignalMatrix>;

    /// One PSD record per channel of `epoch`
    fn psd(&self, epoch: &Epoch, params: &WelchParams) -> EegResult<Vec<PsdRecord>>;

    /// PSD of several epochs sharing the same parameters
    fn psd_all(&self, epochs: &[Epoch], params: &WelchParams) -> EegResult<Vec<Vec<PsdRecord>>> {
        epochs.iter().map(|e| self.psd(e, params)).collect()
    }
}

/// Butterworth biquad cascade plus a real-input FFT Welch estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl SpectralBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn bandpass(&self, matrix: &SignalMatrix, params: &FilterParams) -> EegResult<SignalMatrix> {
        bandpass_with(matrix, params)
    }

    fn psd(&self, epoch: &Epoch, params: &WelchParams) -> EegResult<Vec<PsdRecord>> {
        WelchEstimator::new(params, epoch.sample_rate)?.epoch_psd(epoch)
    }

    // Plan the FFT once for a run of equally sized epochs
    fn psd_all(&self, epochs: &[Epoch], params: &WelchParams) -> EegResult<Vec<Vec<PsdRecord>>> {
        let Some(first) = epochs.first() else {
            return Ok(Vec::new());
        };
        let estimator = WelchEstimator::new(params, first.sample_rate)?;
        epochs.iter().map(|e| estimator.epoch_psd(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::Electrode;
    use std::f64::consts::PI;

    fn sine_epoch(index: usize) -> Epoch {
        let fs = 256.0;
        let row: Vec<f64> = (0..512).map(|i| (2.0 * PI * 10.0 * i as f64 / fs).sin()).collect();
        Epoch {
            index,
            start_sample: index * 512,
            start_time_s: index as f64 * 2.0,
            sample_rate: fs,
            channels: vec![Electrode::AF7, Electrode::AF8],
            samples: vec![row.clone(), row],
        }
    }

    #[test]
    fn test_native_backend_psd_all_matches_single() {
        let backend = NativeBackend;
        let params = WelchParams::default();
        let epochs = vec![sine_epoch(0), sine_epoch(1)];

        let batched = backend.psd_all(&epochs, &params).unwrap();
        assert_eq!(batched.len(), 2);
        assert_eq!(batched[1], backend.psd(&epochs[1], &params).unwrap());
        assert_eq!(batched[0][0].channel, Electrode::AF7);
        assert!(backend.psd_all(&[], &params).unwrap().is_empty());
    }

    #[test]
    fn test_native_backend_bandpass_keeps_shape() {
        let matrix = SignalMatrix::new(
            256.0,
            vec![Electrode::AF7],
            vec![(0..1024).map(|i| (i % 7) as f64).collect()],
            0.0,
        )
        .unwrap();
        let filtered = NativeBackend.bandpass(&matrix, &FilterParams::default()).unwrap();
        assert_eq!(filtered.samples_per_channel(), 1024);
        assert_eq!(NativeBackend.name(), "native");
    }
}
