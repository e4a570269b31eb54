//! EEG-Processing: offline analysis pipeline for raw EEG recordings
//!
//! Resampling, zero-phase bandpass filtering, epoching, artifact rejection,
//! Welch spectral estimation and band-power aggregation, plus the CSV and
//! report outputs. [`Pipeline`] wires the stages together; each stage is also
//! usable on its own.

pub mod artifact;
pub mod bands;
pub mod config;
pub mod epochs;
pub mod export;
pub mod filters;
pub mod ingest;
pub mod pipeline;
pub mod processor;
pub mod resample;
pub mod spectral;

pub use artifact::{reject_artifacts, RejectionCounts, RejectionReport};
pub use bands::{
    band_power, summarize, Band, BandMetrics, BandPowerRecord, ChannelSummary, MeanStd, Metric,
    SummaryRecord,
};
pub use config::{EpochParams, FilterParams, PipelineConfig, RejectionParams, WelchParams};
pub use epochs::segment;
pub use export::OutputPaths;
pub use filters::{bandpass, ButterworthBandpass};
pub use ingest::{parse_raw_csv, read_raw_csv};
pub use pipeline::{Analysis, Pipeline, PipelineResult, PreparedSignal, RunReport};
pub use processor::{NativeBackend, SpectralBackend};
pub use resample::{resample, TimingReport};
pub use spectral::{welch_psd, PsdRecord, Taper, WelchEstimator};
