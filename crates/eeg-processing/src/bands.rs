//! Band powers, DAR/TAR ratios and their aggregation across epochs

use crate::spectral::PsdRecord;
use eeg_core::Electrode;
use serde::Serialize;

/// Canonical EEG frequency bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

/// Frequency range in Hz; the upper edge is exclusive unless `closed` is set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
    pub closed: bool,
}

impl FrequencyBand {
    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low_hz && (freq < self.high_hz || (self.closed && freq == self.high_hz))
    }
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Band edges; only the last band includes its upper edge
    pub fn range(self) -> FrequencyBand {
        let (low_hz, high_hz) = match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 40.0),
        };
        FrequencyBand {
            low_hz,
            high_hz,
            closed: self == Band::Gamma,
        }
    }
}

/// Trapezoidal integral of the PSD over the bins inside `band`, in uV^2
///
/// NaN when the frequency resolution leaves fewer than two bins inside the band.
pub fn band_power(psd: &PsdRecord, band: Band) -> f64 {
    let range = band.range();
    let bins: Vec<(f64, f64)> = psd
        .frequencies
        .iter()
        .zip(&psd.power)
        .filter(|(f, _)| range.contains(**f))
        .map(|(&f, &p)| (f, p))
        .collect();

    if bins.len() < 2 {
        return f64::NAN;
    }
    bins.windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum()
}

/// `numerator / denominator`, or NaN when the denominator is exactly zero
pub fn power_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Named quantities reported per (epoch, channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Band(Band),
    Dar,
    Tar,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Band(Band::Delta),
        Metric::Band(Band::Theta),
        Metric::Band(Band::Alpha),
        Metric::Band(Band::Beta),
        Metric::Band(Band::Gamma),
        Metric::Dar,
        Metric::Tar,
    ];

    /// Column name used in tabular output
    pub fn column(self) -> &'static str {
        match self {
            Metric::Band(Band::Delta) => "delta_power",
            Metric::Band(Band::Theta) => "theta_power",
            Metric::Band(Band::Alpha) => "alpha_power",
            Metric::Band(Band::Beta) => "beta_power",
            Metric::Band(Band::Gamma) => "gamma_power",
            Metric::Dar => "DAR",
            Metric::Tar => "TAR",
        }
    }
}

/// One value per band plus the two ratios
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandMetrics<T> {
    pub delta: T,
    pub theta: T,
    pub alpha: T,
    pub beta: T,
    pub gamma: T,
    #[serde(rename = "DAR")]
    pub dar: T,
    #[serde(rename = "TAR")]
    pub tar: T,
}

impl<T: Copy> BandMetrics<T> {
    pub fn get(&self, metric: Metric) -> T {
        match metric {
            Metric::Band(Band::Delta) => self.delta,
            Metric::Band(Band::Theta) => self.theta,
            Metric::Band(Band::Alpha) => self.alpha,
            Metric::Band(Band::Beta) => self.beta,
            Metric::Band(Band::Gamma) => self.gamma,
            Metric::Dar => self.dar,
            Metric::Tar => self.tar,
        }
    }

    /// Build a value for every metric from a function of the metric
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        BandMetrics {
            delta: f(Metric::Band(Band::Delta)),
            theta: f(Metric::Band(Band::Theta)),
            alpha: f(Metric::Band(Band::Alpha)),
            beta: f(Metric::Band(Band::Beta)),
            gamma: f(Metric::Band(Band::Gamma)),
            dar: f(Metric::Dar),
            tar: f(Metric::Tar),
        }
    }
}

/// Band powers of one (epoch, channel) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPowerRecord {
    /// Index of the epoch in the original segmentation
    pub epoch: usize,
    pub channel: Electrode,
    pub metrics: BandMetrics<f64>,
}

impl BandPowerRecord {
    pub fn from_psd(epoch: usize, psd: &PsdRecord) -> Self {
        let delta = band_power(psd, Band::Delta);
        let theta = band_power(psd, Band::Theta);
        let alpha = band_power(psd, Band::Alpha);
        BandPowerRecord {
            epoch,
            channel: psd.channel,
            metrics: BandMetrics {
                delta,
                theta,
                alpha,
                beta: band_power(psd, Band::Beta),
                gamma: band_power(psd, Band::Gamma),
                dar: power_ratio(delta, alpha),
                tar: power_ratio(theta, alpha),
            },
        }
    }
}

/// Mean and sample standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

impl MeanStd {
    /// Statistics over the non-NaN values; NaN when too few values remain
    pub fn of(values: impl IntoIterator<Item = f64>) -> Self {
        let finite: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        let n = finite.len();
        if n == 0 {
            return MeanStd { mean: f64::NAN, std: f64::NAN };
        }
        let mean = finite.iter().sum::<f64>() / n as f64;
        let std = if n < 2 {
            f64::NAN
        } else {
            (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        };
        MeanStd { mean, std }
    }
}

/// Cross-epoch statistics of one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub channel: Electrode,
    pub kept_epochs: usize,
    pub metrics: BandMetrics<MeanStd>,
}

/// Aggregated result of one recording
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub channels: Vec<ChannelSummary>,
    /// Per-metric mean of the channel means
    pub channel_average: BandMetrics<f64>,
    pub original_epochs: usize,
    pub kept_epochs: usize,
    pub rejection_rate: f64,
}

/// Aggregate per-epoch records of the kept epochs into a recording summary
pub fn summarize(
    records: &[BandPowerRecord],
    channels: &[Electrode],
    original_epochs: usize,
    kept_epochs: usize,
    rejection_rate: f64,
) -> SummaryRecord {
    let channel_summaries: Vec<ChannelSummary> = channels
        .iter()
        .map(|&channel| {
            let rows: Vec<&BandPowerRecord> =
                records.iter().filter(|r| r.channel == channel).collect();
            ChannelSummary {
                channel,
                kept_epochs: rows.len(),
                metrics: BandMetrics::from_fn(|m| {
                    MeanStd::of(rows.iter().map(|r| r.metrics.get(m)))
                }),
            }
        })
        .collect();

    let channel_average = BandMetrics::from_fn(|m| {
        MeanStd::of(channel_summaries.iter().map(|c| c.metrics.get(m).mean)).mean
    });

    SummaryRecord {
        channels: channel_summaries,
        channel_average,
        original_epochs,
        kept_epochs,
        rejection_rate,
    }
}
