//! Orchestration of the stages for one recording
//!
//! ```text
//! raw samples -> resample -> select channels -> [crop] -> bandpass
//!             -> segment -> reject artifacts -> Welch PSD -> band powers -> summary
//! ```
//!
//! The container output is taken from the resampled matrix before cropping,
//! so it always holds the complete recording.

use crate::artifact::{reject_artifacts, RejectionCounts, RejectionReport};
use crate::bands::{summarize, BandMetrics, BandPowerRecord, SummaryRecord};
use crate::config::PipelineConfig;
use crate::epochs::segment;
use crate::export::{write_band_powers_file, write_json_file, write_summary_file, OutputPaths};
use crate::ingest::read_raw_csv;
use crate::processor::{NativeBackend, SpectralBackend};
use crate::resample::{prepare, TimingReport};
use eeg_core::{EdfWriter, EegError, EegResult, Electrode, FormatWriter, RawSample, SignalMatrix};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Uniform signal restricted to the active channels
#[derive(Debug, Clone)]
pub struct PreparedSignal {
    /// Full-length matrix at `target_rate_hz`
    pub matrix: SignalMatrix,
    pub timing: TimingReport,
    pub target_rate_hz: f64,
    /// True if samples were interpolated rather than passed through
    pub resampled: bool,
    pub warnings: Vec<String>,
}

/// Results of the stages from filtering onward
#[derive(Debug, Clone)]
pub struct Analysis {
    pub analysed_duration_s: f64,
    pub rejection: RejectionReport,
    /// Kept epochs only, ordered by epoch then channel
    pub band_powers: Vec<BandPowerRecord>,
    pub summary: SummaryRecord,
    pub warnings: Vec<String>,
}

/// Everything one `process` call produces
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub signal: PreparedSignal,
    pub analysis: Analysis,
}

impl PipelineResult {
    pub fn warnings(&self) -> Vec<String> {
        self.signal
            .warnings
            .iter()
            .chain(&self.analysis.warnings)
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> &SummaryRecord {
        &self.analysis.summary
    }

    /// Machine-readable account of the run
    pub fn report(&self, input: &Path, outputs: OutputPaths, backend: &str) -> RunReport {
        RunReport {
            input: input.to_path_buf(),
            outputs,
            backend: backend.to_string(),
            channels: self.signal.matrix.channels().to_vec(),
            effective_rate_hz: self.signal.timing.effective_rate_hz,
            target_rate_hz: self.signal.target_rate_hz,
            resampled: self.signal.resampled,
            timing: self.signal.timing,
            recorded_duration_s: self.signal.matrix.duration_s(),
            analysed_duration_s: self.analysis.analysed_duration_s,
            thresholds_uv: self.analysis.rejection.thresholds.clone(),
            epochs: self.analysis.rejection.counts(),
            alarm: self.analysis.rejection.alarm,
            warnings: self.warnings(),
            channel_average: self.analysis.summary.channel_average,
        }
    }
}

/// Serialized next to the tabular outputs as `<name>_report.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub outputs: OutputPaths,
    pub backend: String,
    pub channels: Vec<Electrode>,
    pub effective_rate_hz: f64,
    pub target_rate_hz: f64,
    pub resampled: bool,
    pub timing: TimingReport,
    pub recorded_duration_s: f64,
    pub analysed_duration_s: f64,
    /// Peak-to-peak rejection threshold per channel, in `channels` order
    pub thresholds_uv: Vec<f64>,
    pub epochs: RejectionCounts,
    pub alarm: bool,
    pub warnings: Vec<String>,
    /// Mean over channels of each per-channel mean
    pub channel_average: BandMetrics<f64>,
}

/// Processing pipeline for complete recordings
pub struct Pipeline<B: SpectralBackend = NativeBackend> {
    config: PipelineConfig,
    backend: B,
}

impl Pipeline<NativeBackend> {
    /// Create a pipeline with the built-in numeric backend
    pub fn new(config: PipelineConfig) -> EegResult<Self> {
        Self::with_backend(config, NativeBackend)
    }
}

impl<B: SpectralBackend> Pipeline<B> {
    pub fn with_backend(config: PipelineConfig, backend: B) -> EegResult<Self> {
        config.validate()?;
        Ok(Pipeline { config, backend })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Resample the raw stream and keep the active channels
    pub fn prepare_signal(&self, raw: &[RawSample]) -> EegResult<PreparedSignal> {
        let stream = prepare(raw)?;
        let timing = stream.timing;
        let target_rate_hz = self.config.target_rate_hz.unwrap_or_else(|| timing.snapped_rate());
        self.config.filter.check_nyquist(target_rate_hz)?;

        let tolerance = self.config.irregularity_tolerance;
        let resampled = timing.needs_interpolation(target_rate_hz, tolerance);
        let matrix = stream.to_uniform(target_rate_hz, tolerance)?.select(&self.config.channels)?;

        let mut warnings = Vec::new();
        if timing.duplicates_dropped > 0 {
            warnings.push(format!(
                "{} samples with repeated timestamps were dropped",
                timing.duplicates_dropped
            ));
        }
        if timing.out_of_order > 0 {
            warnings.push(format!(
                "{} samples arrived out of timestamp order",
                timing.out_of_order
            ));
        }
        if resampled {
            warnings.push(format!(
                "irregular sampling (effective {:.2} Hz, interval CV {:.3}), interpolated to {} Hz",
                timing.effective_rate_hz, timing.interval_cv, target_rate_hz
            ));
        }

        debug!(
            target_rate_hz,
            resampled,
            samples = matrix.samples_per_channel(),
            channels = matrix.channel_count(),
            "prepared signal"
        );
        Ok(PreparedSignal { matrix, timing, target_rate_hz, resampled, warnings })
    }

    /// Filter, segment, reject and summarise a uniform matrix
    pub fn analyse(&self, matrix: &SignalMatrix) -> EegResult<Analysis> {
        let matrix = match self.config.max_duration_s {
            Some(seconds) => matrix.crop(seconds)?,
            None => matrix.clone(),
        };
        let analysed_duration_s = matrix.duration_s();

        let filtered = self.backend.bandpass(&matrix, &self.config.filter)?;
        let epochs = segment(&filtered, self.config.epoch.duration_s, self.config.epoch.step_s)?;
        if epochs.is_empty() {
            return Err(EegError::InsufficientData {
                required: (self.config.epoch.duration_s * filtered.sample_rate()).round() as usize,
                available: filtered.samples_per_channel(),
            });
        }

        let rejection = reject_artifacts(&epochs, &self.config.rejection)?;
        if rejection.kept.is_empty() {
            return Err(EegError::NoValidEpochs { original_epochs: rejection.original_epochs });
        }

        let mut warnings = Vec::new();
        if rejection.alarm {
            warnings.push(format!(
                "rejection rate {:.1}% exceeds {:.1}%",
                rejection.rejection_rate * 100.0,
                self.config.rejection.alarm_rate * 100.0
            ));
        }

        let spectra = self.backend.psd_all(&rejection.kept, &self.config.welch)?;
        let band_powers: Vec<BandPowerRecord> = rejection
            .kept
            .iter()
            .zip(&spectra)
            .flat_map(|(epoch, psds)| {
                psds.iter().map(move |psd| BandPowerRecord::from_psd(epoch.index, psd))
            })
            .collect();

        let summary = summarize(
            &band_powers,
            filtered.channels(),
            rejection.original_epochs,
            rejection.kept_epoch_count(),
            rejection.rejection_rate,
        );

        Ok(Analysis { analysed_duration_s, rejection, band_powers, summary, warnings })
    }

    /// Run every stage on one raw recording
    pub fn process(&self, raw: &[RawSample]) -> EegResult<PipelineResult> {
        let signal = self.prepare_signal(raw)?;
        let analysis = self.analyse(&signal.matrix)?;
        info!(
            kept_epochs = analysis.summary.kept_epochs,
            original_epochs = analysis.summary.original_epochs,
            alpha = analysis.summary.channel_average.alpha,
            "recording processed"
        );
        Ok(PipelineResult { signal, analysis })
    }

    /// Read `input`, process it and write the four outputs into `output_dir`
    pub fn process_file(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> EegResult<(PipelineResult, RunReport)> {
        info!(input = %input.display(), "processing recording");
        let raw = read_raw_csv(input)?;
        let result = self.process(&raw)?;

        std::fs::create_dir_all(output_dir)?;
        let paths = OutputPaths::for_input(input, output_dir);
        let report = result.report(input, paths, self.backend_name());

        // Outputs are written under temporary names and only then moved into place
        let staged = report.outputs.staging();
        if let Err(e) = write_outputs(&result, &report, &staged) {
            staged.discard();
            return Err(e);
        }
        staged.commit(&report.outputs)?;
        info!(output_dir = %output_dir.display(), "outputs written");
        Ok((result, report))
    }
}

fn write_outputs(
    result: &PipelineResult,
    report: &RunReport,
    paths: &OutputPaths,
) -> EegResult<()> {
    let container = EdfWriter::new();
    container.write(&result.signal.matrix, &paths.container)?;
    debug!(format = container.format_name(), path = %paths.container.display(), "wrote container");
    write_band_powers_file(&result.analysis.band_powers, &paths.band_powers)?;
    write_summary_file(&result.analysis.summary, &paths.summary)?;
    write_json_file(report, &paths.report)
}
