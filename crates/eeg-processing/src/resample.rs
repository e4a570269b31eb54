//! Conversion of the raw timestamped stream into a uniform SignalMatrix

use eeg_core::{EegError, EegResult, Electrode, RawSample, SignalMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Rates the acquisition hardware is known to run at
pub const STANDARD_RATES_HZ: [f64; 4] = [250.0, 256.0, 500.0, 512.0];

/// Default coefficient-of-variation tolerance for [`resample`]
pub const DEFAULT_IRREGULARITY_TOLERANCE: f64 = 0.05;

/// Largest accepted ratio between the interpolation grid and the grid implied by the sample count
pub const MAX_GRID_EXPANSION: f64 = 4.0;

/// Timing statistics of a raw stream after ordering and de-duplication
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    /// Rows received
    pub input_samples: usize,
    /// Rows dropped because their timestamp repeated an earlier one
    pub duplicates_dropped: usize,
    /// Rows whose timestamp was below the preceding row's
    pub out_of_order: usize,
    /// 1000 / median interval
    pub effective_rate_hz: f64,
    pub median_interval_ms: f64,
    /// Standard deviation of intervals divided by their mean
    pub interval_cv: f64,
}

impl TimingReport {
    /// Closest standard acquisition rate to the effective rate
    pub fn snapped_rate(&self) -> f64 {
        snap_to_standard_rate(self.effective_rate_hz)
    }

    /// True when the stream cannot simply be relabelled as `target_rate`
    pub fn needs_interpolation(&self, target_rate: f64, tolerance: f64) -> bool {
        let rate_mismatch = (self.effective_rate_hz - target_rate).abs() / target_rate;
        self.interval_cv > tolerance || rate_mismatch > tolerance
    }
}

/// A validated, time-ordered raw stream with distinct timestamps
#[derive(Debug, Clone)]
pub struct PreparedStream {
    samples: Vec<RawSample>,
    pub timing: TimingReport,
}

/// Nearest entry of [`STANDARD_RATES_HZ`]
pub fn snap_to_standard_rate(rate: f64) -> f64 {
    STANDARD_RATES_HZ
        .iter()
        .copied()
        .min_by(|a, b| (a - rate).abs().total_cmp(&(b - rate).abs()))
        .unwrap_or(rate)
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Validate, order and de-duplicate a raw stream and measure its timing
pub fn prepare(raw: &[RawSample]) -> EegResult<PreparedStream> {
    if raw.len() < 2 {
        return Err(EegError::malformed(format!("need at least 2 samples, got {}", raw.len())));
    }
    if let Some(row) = raw.iter().position(|s| !s.is_finite()) {
        return Err(EegError::malformed(format!("sample {} contains a non-finite value", row + 1)));
    }

    let out_of_order = raw.windows(2).filter(|w| w[1].timestamp_ms < w[0].timestamp_ms).count();
    let mut samples = raw.to_vec();
    if out_of_order > 0 {
        warn!(out_of_order, "raw timestamps are not monotonic, reordering");
        samples.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
    }

    let before = samples.len();
    samples.dedup_by(|later, kept| later.timestamp_ms == kept.timestamp_ms);
    let duplicates_dropped = before - samples.len();
    if duplicates_dropped > 0 {
        warn!(duplicates_dropped, "dropped samples with repeated timestamps");
    }

    if samples.len() < 2 {
        return Err(EegError::malformed("fewer than 2 distinct timestamps"));
    }

    let intervals: Vec<f64> = samples
        .windows(2)
        .map(|w| w[1].timestamp_ms - w[0].timestamp_ms)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let variance =
        intervals.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
    let median_interval_ms = median(&mut intervals.clone());

    let timing = TimingReport {
        input_samples: raw.len(),
        duplicates_dropped,
        out_of_order,
        effective_rate_hz: 1000.0 / median_interval_ms,
        median_interval_ms,
        interval_cv: variance.sqrt() / mean,
    };
    debug!(
        effective_rate_hz = timing.effective_rate_hz,
        interval_cv = timing.interval_cv,
        "measured raw stream timing"
    );

    Ok(PreparedStream { samples, timing })
}

impl PreparedStream {
    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    fn first_ms(&self) -> f64 {
        self.samples[0].timestamp_ms
    }

    fn last_ms(&self) -> f64 {
        self.samples[self.samples.len() - 1].timestamp_ms
    }

    /// Produce the uniform four-channel matrix at `target_rate`
    pub fn to_uniform(&self, target_rate: f64, tolerance: f64) -> EegResult<SignalMatrix> {
        if !(target_rate.is_finite() && target_rate > 0.0) {
            return Err(EegError::invalid(
                "target_rate_hz",
                format!("{} Hz is not a positive rate", target_rate),
            ));
        }

        let rows = if self.timing.needs_interpolation(target_rate, tolerance) {
            info!(
                effective_rate_hz = self.timing.effective_rate_hz,
                target_rate,
                interval_cv = self.timing.interval_cv,
                "irregular sampling, interpolating onto a uniform grid"
            );
            self.interpolate(target_rate)?
        } else {
            // Already on a uniform grid: keep values, relabel times as t0 + k / rate
            Electrode::ALL
                .iter()
                .map(|&e| self.samples.iter().map(|s| s.value(e)).collect())
                .collect()
        };

        SignalMatrix::new(target_rate, Electrode::ALL.to_vec(), rows, self.first_ms())
    }

    /// Linear interpolation onto `t0 + k * 1000 / rate` for every grid point up to the last
    /// timestamp
    fn interpolate(&self, target_rate: f64) -> EegResult<Vec<Vec<f64>>> {
        let step_ms = 1000.0 / target_rate;
        let t0 = self.first_ms();
        let span = self.last_ms() - t0;
        let grid_points = (span / step_ms + 1e-9).floor() + 1.0;

        // Outlier timestamps stretch the span far beyond what the samples can cover
        let expected = self.samples.len() as f64 * target_rate / self.timing.effective_rate_hz;
        let limit = (MAX_GRID_EXPANSION * expected).ceil();
        if !(grid_points <= limit) {
            return Err(EegError::malformed(format!(
                "timestamps span {:.0} ms, which would need {:.0} grid points \
                 for {} samples (limit {:.0})",
                span,
                grid_points,
                self.samples.len(),
                limit
            )));
        }
        let grid_len = grid_points as usize;

        let mut rows = vec![Vec::with_capacity(grid_len); Electrode::ALL.len()];
        let mut j = 0;
        for k in 0..grid_len {
            let t = (t0 + k as f64 * step_ms).min(self.last_ms());
            while j + 2 < self.samples.len() && self.samples[j + 1].timestamp_ms < t {
                j += 1;
            }
            let (a, b) = (&self.samples[j], &self.samples[j + 1]);
            let frac = ((t - a.timestamp_ms) / (b.timestamp_ms - a.timestamp_ms)).clamp(0.0, 1.0);
            for (row, (va, vb)) in rows.iter_mut().zip(a.channels.iter().zip(b.channels.iter())) {
                row.push(va + frac * (vb - va));
            }
        }
        Ok(rows)
    }
}

/// Resample a raw stream onto a uniform grid at `target_rate`
pub fn resample(raw: &[RawSample], target_rate: f64) -> EegResult<SignalMatrix> {
    prepare(raw)?.to_uniform(target_rate, DEFAULT_IRREGULARITY_TOLERANCE)
}
