//! Configuration for the offline EEG pipeline
//!
//! All tunable numbers of the pipeline live in one [`PipelineConfig`] value.
//! Stages receive it by reference and never consult any other source of
//! defaults.

use crate::spectral::Taper;
use eeg_core::{EegError, EegResult, Electrode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete, immutable parameter set for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Active channel subset, in output order
    pub channels: Vec<Electrode>,
    /// Uniform output rate; `None` infers it from the data and snaps to a standard rate
    pub target_rate_hz: Option<f64>,
    /// Coefficient of variation of sample intervals above which input counts as irregular
    pub irregularity_tolerance: f64,
    /// Only the first this many seconds are analysed; the container output stays complete
    pub max_duration_s: Option<f64>,
    pub filter: FilterParams,
    pub epoch: EpochParams,
    pub rejection: RejectionParams,
    pub welch: WelchParams,
}

/// Zero-phase Butterworth bandpass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub low_hz: f64,
    pub high_hz: f64,
    /// Order of each of the highpass and lowpass halves; must be even
    pub order: usize,
}

/// Segmentation used for artifact rejection and per-epoch results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochParams {
    pub duration_s: f64,
    pub step_s: f64,
}

/// Data-driven peak-to-peak rejection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectionParams {
    /// Quantile of the per-channel peak-to-peak distribution, in `[0.5, 1.0]`
    pub quantile: f64,
    /// Threshold = `factor * quantile value`; at least 1.0
    pub factor: f64,
    /// Rejection rate above which a data-quality warning is raised
    pub alarm_rate: f64,
}

/// Welch sub-windowing inside each kept epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchParams {
    pub window_s: f64,
    /// Overlap between consecutive sub-windows; the step is `window_s - overlap_s`
    pub overlap_s: f64,
    pub taper: Taper,
    pub fmin_hz: f64,
    pub fmax_hz: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            channels: vec![Electrode::AF7, Electrode::AF8],
            target_rate_hz: None,
            irregularity_tolerance: 0.05,
            max_duration_s: None,
            filter: FilterParams::default(),
            epoch: EpochParams::default(),
            rejection: RejectionParams::default(),
            welch: WelchParams::default(),
        }
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams { low_hz: 1.0, high_hz: 40.0, order: 4 }
    }
}

impl Default for EpochParams {
    fn default() -> Self {
        EpochParams { duration_s: 2.0, step_s: 2.0 }
    }
}

impl Default for RejectionParams {
    fn default() -> Self {
        RejectionParams { quantile: 0.75, factor: 2.0, alarm_rate: 0.5 }
    }
}

impl Default for WelchParams {
    fn default() -> Self {
        WelchParams {
            window_s: 2.0,
            overlap_s: 1.0,
            taper: Taper::Hamming,
            fmin_hz: 1.0,
            fmax_hz: 40.0,
        }
    }
}

fn positive(name: &'static str, value: f64) -> EegResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EegError::invalid(name, format!("must be a positive number, got {}", value)))
    }
}

impl PipelineConfig {
    /// Validate every field before any data is touched
    pub fn validate(&self) -> EegResult<()> {
        if self.channels.is_empty() {
            return Err(EegError::invalid("channels", "at least one channel is required"));
        }
        for (i, e) in self.channels.iter().enumerate() {
            if self.channels[..i].contains(e) {
                return Err(EegError::invalid("channels", format!("{} is listed twice", e)));
            }
        }

        if let Some(rate) = self.target_rate_hz {
            positive("target_rate_hz", rate)?;
        }
        if !(self.irregularity_tolerance.is_finite() && self.irregularity_tolerance >= 0.0) {
            return Err(EegError::invalid(
                "irregularity_tolerance",
                "must be a non-negative number",
            ));
        }
        if let Some(seconds) = self.max_duration_s {
            positive("max_duration_s", seconds)?;
        }

        self.filter.validate()?;
        if let Some(rate) = self.target_rate_hz {
            self.filter.check_nyquist(rate)?;
        }

        positive("epoch.duration_s", self.epoch.duration_s)?;
        positive("epoch.step_s", self.epoch.step_s)?;
        if self.epoch.step_s > self.epoch.duration_s {
            return Err(EegError::invalid("epoch.step_s", "must not exceed epoch.duration_s"));
        }

        let r = &self.rejection;
        if !(0.5..=1.0).contains(&r.quantile) {
            return Err(EegError::invalid(
                "rejection.quantile",
                format!("{} is outside [0.5, 1.0]", r.quantile),
            ));
        }
        if !(r.factor.is_finite() && r.factor >= 1.0) {
            return Err(EegError::invalid("rejection.factor", "must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&r.alarm_rate) {
            return Err(EegError::invalid("rejection.alarm_rate", "must be within [0, 1]"));
        }

        let w = &self.welch;
        positive("welch.window_s", w.window_s)?;
        if !(w.overlap_s.is_finite() && w.overlap_s >= 0.0 && w.overlap_s < w.window_s) {
            return Err(EegError::invalid("welch.overlap_s", "must be in [0, window_s)"));
        }
        if !(w.fmin_hz >= 0.0 && w.fmin_hz < w.fmax_hz) {
            return Err(EegError::invalid(
                "welch.fmin_hz",
                "must be non-negative and below welch.fmax_hz",
            ));
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> EegResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EegError::Json(format!("Failed to serialize configuration: {}", e)))
    }

    /// Import configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> EegResult<Self> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| EegError::Json(format!("Failed to deserialize configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> EegResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl FilterParams {
    pub fn validate(&self) -> EegResult<()> {
        positive("filter.low_hz", self.low_hz)?;
        positive("filter.high_hz", self.high_hz)?;
        if self.low_hz >= self.high_hz {
            return Err(EegError::invalid(
                "filter.low_hz",
                format!(
                    "low cutoff {} Hz must be below high cutoff {} Hz",
                    self.low_hz, self.high_hz
                ),
            ));
        }
        if self.order == 0 || self.order % 2 != 0 {
            return Err(EegError::invalid(
                "filter.order",
                format!("{} is not a positive even order", self.order),
            ));
        }
        Ok(())
    }

    /// The high cutoff must stay below the Nyquist frequency of `sample_rate`
    pub fn check_nyquist(&self, sample_rate: f64) -> EegResult<()> {
        let nyquist = sample_rate / 2.0;
        if self.high_hz >= nyquist {
            return Err(EegError::invalid(
                "filter.high_hz",
                format!("{} Hz is not below the Nyquist frequency {} Hz", self.high_hz, nyquist),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.channels, vec![Electrode::AF7, Electrode::AF8]);
        assert_eq!(config.epoch.duration_s, 2.0);
        assert_eq!(config.welch.overlap_s, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();

        config.filter.low_hz = 45.0;
        assert!(matches!(
            config.validate(),
            Err(EegError::InvalidParameter { name: "filter.low_hz", .. })
        ));

        config = PipelineConfig::default();
        config.epoch.step_s = 3.0;
        assert!(config.validate().is_err());

        config = PipelineConfig::default();
        config.rejection.quantile = 0.3;
        assert!(config.validate().is_err());

        config = PipelineConfig::default();
        config.welch.overlap_s = 2.0;
        assert!(config.validate().is_err());

        config = PipelineConfig::default();
        config.channels = vec![Electrode::AF7, Electrode::AF7];
        assert!(config.validate().is_err());

        config = PipelineConfig::default();
        config.filter.order = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nyquist_check_with_explicit_rate() {
        let mut config = PipelineConfig::default();
        config.target_rate_hz = Some(80.0);
        assert!(matches!(
            config.validate(),
            Err(EegError::InvalidParameter { name: "filter.high_hz", .. })
        ));
        config.target_rate_hz = Some(256.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_serialization() {
        let mut config = PipelineConfig::default();
        config.max_duration_s = Some(30.0);
        config.welch.taper = Taper::Hann;

        let json = config.to_json().unwrap();
        let restored = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "channels": ["TP9", "AF7", "AF8", "TP10"], "epoch": { "step_s": 1.0 } }"#;
        let config = PipelineConfig::from_json(json).unwrap();
        assert_eq!(config.channels.len(), 4);
        assert_eq!(config.epoch.duration_s, 2.0);
        assert_eq!(config.epoch.step_s, 1.0);
        assert_eq!(config.filter, FilterParams::default());
    }

    #[test]
    fn test_invalid_json_is_configuration_defect() {
        let err = PipelineConfig::from_json("{ not json").unwrap_err();
        assert!(err.is_configuration_defect());
    }
}
