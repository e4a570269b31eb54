//! Data-driven artifact rejection
//!
//! Each channel gets its own peak-to-peak threshold, computed from the
//! distribution of that channel's epoch-wise peak-to-peak amplitudes in the
//! current recording: `factor * quantile(ptp, q)`. Lowering `q` can only
//! lower the threshold, so it never reduces the number of rejections.
//!
//! With three or more active channels a single over-threshold channel is
//! rebuilt from the others by inverse-distance weighting and the epoch is
//! kept. Otherwise every over-threshold channel is rejected, and an epoch
//! with any rejected channel is rejected as a whole.

use crate::config::RejectionParams;
use eeg_core::{EegResult, Epoch, EpochQuality, QualityStatus};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Channels needed before a bad channel may be interpolated
pub const MIN_CHANNELS_FOR_INTERPOLATION: usize = 3;

/// Outcome of artifact rejection for one recording
#[derive(Debug, Clone)]
pub struct RejectionReport {
    /// Peak-to-peak threshold per channel, in microvolts
    pub thresholds: Vec<f64>,
    /// Verdicts indexed `[epoch][channel]`, covering every input epoch
    pub quality: Vec<Vec<EpochQuality>>,
    /// Surviving epochs, with interpolated channels already replaced
    pub kept: Vec<Epoch>,
    pub original_epochs: usize,
    pub rejected_epochs: usize,
    /// `rejected_epochs / original_epochs`; NaN when there were no epochs
    pub rejection_rate: f64,
    pub interpolation_enabled: bool,
    /// Rejection rate exceeded the configured alarm level
    pub alarm: bool,
}

/// Summary counters suitable for reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RejectionCounts {
    pub original_epochs: usize,
    pub kept_epochs: usize,
    pub rejected_epochs: usize,
    pub interpolated_channels: usize,
    pub rejection_rate: f64,
}

impl RejectionReport {
    pub fn kept_epoch_count(&self) -> usize {
        self.kept.len()
    }

    /// True if any channel of the epoch was rejected
    pub fn is_epoch_rejected(&self, epoch_index: usize) -> bool {
        self.quality
            .get(epoch_index)
            .is_some_and(|row| row.iter().any(|q| !q.status.is_usable()))
    }

    pub fn counts(&self) -> RejectionCounts {
        let interpolated_channels = self
            .quality
            .iter()
            .flatten()
            .filter(|q| q.status == QualityStatus::Interpolated)
            .count();
        RejectionCounts {
            original_epochs: self.original_epochs,
            kept_epochs: self.kept_epoch_count(),
            rejected_epochs: self.rejected_epochs,
            interpolated_channels,
            rejection_rate: self.rejection_rate,
        }
    }
}

/// Quantile with linear interpolation between order statistics
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Per-channel peak-to-peak thresholds for a set of epochs
pub fn channel_thresholds(epochs: &[Epoch], params: &RejectionParams) -> Vec<f64> {
    let channel_count = epochs.first().map_or(0, |e| e.channels.len());
    let ptp: Vec<Vec<f64>> = epochs.iter().map(Epoch::peak_to_peak).collect();
    (0..channel_count)
        .map(|ch| {
            let column: Vec<f64> = ptp.iter().map(|row| row[ch]).collect();
            params.factor * quantile(&column, params.quantile)
        })
        .collect()
}

/// Inverse-distance estimate of channel `target` from every other channel
fn interpolate_channel(epoch: &Epoch, target: usize) -> Vec<f64> {
    let electrode = epoch.channels[target];
    let weights: Vec<(usize, f64)> = epoch
        .channels
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != target)
        .map(|(i, &other)| (i, 1.0 / electrode.distance_to(other).max(1e-6)))
        .collect();
    let total: f64 = weights.iter().map(|(_, w)| w).sum();

    (0..epoch.len())
        .map(|t| weights.iter().map(|&(i, w)| w * epoch.samples[i][t]).sum::<f64>() / total)
        .collect()
}

/// Score every (epoch, channel) pair and keep the usable epochs
pub fn reject_artifacts(epochs: &[Epoch], params: &RejectionParams) -> EegResult<RejectionReport> {
    let thresholds = channel_thresholds(epochs, params);
    let channel_count = thresholds.len();
    let interpolation_enabled = channel_count >= MIN_CHANNELS_FOR_INTERPOLATION;
    debug!(?thresholds, interpolation_enabled, "artifact thresholds");

    let mut quality = Vec::with_capacity(epochs.len());
    let mut kept = Vec::new();

    for epoch in epochs {
        let ptp = epoch.peak_to_peak();
        let bad: Vec<usize> = (0..channel_count).filter(|&ch| ptp[ch] > thresholds[ch]).collect();
        let repairable = interpolation_enabled && bad.len() == 1;

        let row: Vec<EpochQuality> = (0..channel_count)
            .map(|ch| {
                let score = if thresholds[ch] > 0.0 { ptp[ch] / thresholds[ch] } else { 0.0 };
                let status = if !bad.contains(&ch) {
                    QualityStatus::Kept
                } else if repairable {
                    QualityStatus::Interpolated
                } else {
                    QualityStatus::Rejected
                };
                EpochQuality::new(status, score)
            })
            .collect();

        if bad.is_empty() {
            kept.push(epoch.clone());
        } else if repairable {
            let mut repaired = epoch.clone();
            repaired.samples[bad[0]] = interpolate_channel(epoch, bad[0]);
            kept.push(repaired);
        }
        quality.push(row);
    }

    let original_epochs = epochs.len();
    let rejected_epochs = original_epochs - kept.len();
    let rejection_rate = if original_epochs == 0 {
        f64::NAN
    } else {
        rejected_epochs as f64 / original_epochs as f64
    };
    let alarm = rejection_rate > params.alarm_rate;

    if alarm {
        warn!(
            rejection_rate,
            alarm_rate = params.alarm_rate,
            rejected_epochs,
            original_epochs,
            "high artifact rejection rate"
        );
    } else {
        info!(rejected_epochs, original_epochs, "artifact rejection complete");
    }

    Ok(RejectionReport {
        thresholds,
        quality,
        kept,
        original_epochs,
        rejected_epochs,
        rejection_rate,
        interpolation_enabled,
        alarm,
    })
}
