//! Artifact verdicts attached to each (epoch, channel) pair

use serde::{Deserialize, Serialize};

/// Outcome of amplitude screening for one epoch on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
    /// Within the channel's amplitude threshold
    Kept,
    /// Over threshold and not recoverable
    Rejected,
    /// Over threshold, replaced by an estimate from neighbouring electrodes
    Interpolated,
}

impl QualityStatus {
    /// Kept and interpolated data both count towards the aggregates
    pub fn is_usable(self) -> bool {
        !matches!(self, QualityStatus::Rejected)
    }
}

impl std::fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityStatus::Kept => write!(f, "KEPT"),
            QualityStatus::Rejected => write!(f, "REJECTED"),
            QualityStatus::Interpolated => write!(f, "INTERPOLATED"),
        }
    }
}

/// Per-(epoch, channel) verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochQuality {
    pub status: QualityStatus,
    /// Peak-to-peak amplitude divided by the channel threshold; above 1.0 means over threshold
    pub score: f64,
}

impl EpochQuality {
    pub fn new(status: QualityStatus, score: f64) -> Self {
        Self { status, score }
    }
}
