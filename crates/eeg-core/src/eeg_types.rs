//! EEG-specific channel layout and raw sample types

use crate::error::{EegError, EegResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of electrodes on the headband
pub const CHANNEL_COUNT: usize = 4;

/// Physical unit of every voltage in the pipeline
pub const PHYSICAL_UNIT: &str = "uV";

/// Electrode positions of the four-channel headband, in acquisition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Electrode {
    TP9,
    AF7,
    AF8,
    TP10,
}

impl Electrode {
    /// All electrodes in the column order of the raw stream
    pub const ALL: [Electrode; CHANNEL_COUNT] =
        [Electrode::TP9, Electrode::AF7, Electrode::AF8, Electrode::TP10];

    /// Column index of this electrode within a [`RawSample`]
    pub fn index(self) -> usize {
        match self {
            Electrode::TP9 => 0,
            Electrode::AF7 => 1,
            Electrode::AF8 => 2,
            Electrode::TP10 => 3,
        }
    }

    /// 10-20 label
    pub fn label(self) -> &'static str {
        match self {
            Electrode::TP9 => "TP9",
            Electrode::AF7 => "AF7",
            Electrode::AF8 => "AF8",
            Electrode::TP10 => "TP10",
        }
    }

    /// Approximate position on the unit head circle (x to the right, y to the nose)
    pub fn position(self) -> (f64, f64) {
        match self {
            Electrode::TP9 => (-0.87, -0.30),
            Electrode::AF7 => (-0.55, 0.67),
            Electrode::AF8 => (0.55, 0.67),
            Electrode::TP10 => (0.87, -0.30),
        }
    }

    /// Planar distance between two electrode positions
    pub fn distance_to(self, other: Electrode) -> f64 {
        let (x1, y1) = self.position();
        let (x2, y2) = other.position();
        ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
    }

    /// Parse a comma-separated list such as `AF7,AF8`
    pub fn parse_list(list: &str) -> EegResult<Vec<Electrode>> {
        let electrodes = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<EegResult<Vec<_>>>()?;
        if electrodes.is_empty() {
            return Err(EegError::invalid("channels", "at least one channel is required"));
        }
        Ok(electrodes)
    }
}

impl FromStr for Electrode {
    type Err = EegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Electrode::ALL
            .iter()
            .copied()
            .find(|e| e.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                EegError::invalid(
                    "channels",
                    format!("unknown electrode '{}' (expected TP9, AF7, AF8 or TP10)", s),
                )
            })
    }
}

impl std::fmt::Display for Electrode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One row of the raw, possibly irregular, acquisition stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Acquisition time in milliseconds
    pub timestamp_ms: f64,
    /// Voltages in microvolts, indexed by [`Electrode::index`]
    pub channels: [f64; CHANNEL_COUNT],
}

impl RawSample {
    pub fn new(timestamp_ms: f64, channels: [f64; CHANNEL_COUNT]) -> Self {
        Self { timestamp_ms, channels }
    }

    /// Voltage recorded at one electrode
    pub fn value(&self, electrode: Electrode) -> f64 {
        self.channels[electrode.index()]
    }

    /// True when the timestamp and every voltage are finite
    pub fn is_finite(&self) -> bool {
        self.timestamp_ms.is_finite() && self.channels.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_electrode_parsing() {
        assert_eq!("af7".parse::<Electrode>().unwrap(), Electrode::AF7);
        assert_eq!("TP10".parse::<Electrode>().unwrap(), Electrode::TP10);
        assert!("Cz".parse::<Electrode>().is_err());
    }

    #[test]
    fn test_parse_list() {
        let list = Electrode::parse_list("AF7, AF8").unwrap();
        assert_eq!(list, vec![Electrode::AF7, Electrode::AF8]);
        assert!(Electrode::parse_list(" , ").is_err());
    }

    #[test]
    fn test_column_order_matches_all() {
        for (i, e) in Electrode::ALL.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
    }

    #[test]
    fn test_neighbour_distances() {
        // Frontal pair is closer to each other than to the opposite temporal site
        let near = Electrode::AF7.distance_to(Electrode::AF8);
        assert!(near < Electrode::AF7.distance_to(Electrode::TP10));
        assert_eq!(Electrode::TP9.distance_to(Electrode::TP9), 0.0);
    }

    #[test]
    fn test_raw_sample_finiteness() {
        let ok = RawSample::new(0.0, [1.0, 2.0, 3.0, 4.0]);
        let bad = RawSample::new(4.0, [1.0, f64::NAN, 3.0, 4.0]);
        assert!(ok.is_finite());
        assert!(!bad.is_finite());
        assert_eq!(ok.value(Electrode::AF8), 3.0);
    }
}
