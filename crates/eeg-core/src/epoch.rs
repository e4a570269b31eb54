//! Fixed-length analysis windows cut from a SignalMatrix

use crate::eeg_types::Electrode;
use crate::signal_matrix::ChannelStats;

/// A contiguous slice of every channel, owned independently of its source matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    /// Position of this epoch in the segmentation, counted before rejection
    pub index: usize,
    /// First sample of the epoch within the source matrix
    pub start_sample: usize,
    /// Start time in seconds relative to the first sample of the matrix
    pub start_time_s: f64,
    pub sample_rate: f64,
    pub channels: Vec<Electrode>,
    /// Voltages in microvolts, `samples[channel][time_index]`
    pub samples: Vec<Vec<f64>>,
}

impl Epoch {
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_s(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    /// Peak-to-peak amplitude of every channel
    pub fn peak_to_peak(&self) -> Vec<f64> {
        self.samples
            .iter()
            .map(|row| ChannelStats::calculate(row).peak_to_peak)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_shape() {
        let epoch = Epoch {
            index: 3,
            start_sample: 1536,
            start_time_s: 6.0,
            sample_rate: 256.0,
            channels: vec![Electrode::AF7, Electrode::AF8],
            samples: vec![vec![1.0, -1.0, 3.0, 0.0], vec![0.0; 4]],
        };
        assert_eq!(epoch.len(), 4);
        assert_eq!(epoch.peak_to_peak(), vec![4.0, 0.0]);
        assert!((epoch.duration_s() - 4.0 / 256.0).abs() < 1e-12);
    }
}
