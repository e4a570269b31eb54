//! Fixed-length segmentation of a filtered recording

use eeg_core::{EegError, EegResult, Epoch, SignalMatrix};
use tracing::{debug, warn};

/// Number of whole epochs that fit in `total` samples
pub fn epoch_count(total: usize, epoch_len: usize, step: usize) -> usize {
    if epoch_len == 0 || step == 0 || total < epoch_len {
        0
    } else {
        (total - epoch_len) / step + 1
    }
}

/// Slice every channel into epochs of `duration_s`, starting every `step_s`
///
/// A trailing partial epoch is dropped. A recording shorter than one epoch
/// yields an empty sequence.
pub fn segment(matrix: &SignalMatrix, duration_s: f64, step_s: f64) -> EegResult<Vec<Epoch>> {
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return Err(EegError::invalid("epoch.duration_s", "must be positive"));
    }
    if !(step_s.is_finite() && step_s > 0.0 && step_s <= duration_s) {
        return Err(EegError::invalid(
            "epoch.step_s",
            "must be positive and not exceed epoch.duration_s",
        ));
    }

    let fs = matrix.sample_rate();
    let epoch_len = (duration_s * fs).round() as usize;
    let step = ((step_s * fs).round() as usize).max(1);
    let total = matrix.samples_per_channel();
    let count = epoch_count(total, epoch_len, step);

    if count == 0 {
        warn!(
            duration_s = matrix.duration_s(),
            epoch_duration_s = duration_s,
            "recording is shorter than one epoch"
        );
        return Ok(Vec::new());
    }

    let epochs: Vec<Epoch> = (0..count)
        .map(|index| {
            let start = index * step;
            Epoch {
                index,
                start_sample: start,
                start_time_s: start as f64 / fs,
                sample_rate: fs,
                channels: matrix.channels().to_vec(),
                samples: matrix
                    .rows()
                    .iter()
                    .map(|row| row[start..start + epoch_len].to_vec())
                    .collect(),
            }
        })
        .collect();

    debug!(
        epochs = epochs.len(),
        epoch_len,
        step,
        dropped_tail = total - ((count - 1) * step + epoch_len),
        "segmented recording"
    );
    Ok(epochs)
}
