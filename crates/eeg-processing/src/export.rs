//! Tabular and report outputs
//!
//! Output names are derived from the input's base name:
//! `<name>.edf`, `<name>_band_powers.csv`, `<name>_summary.csv` and
//! `<name>_report.json`. Undefined values are written as `NaN`.

use crate::bands::{BandPowerRecord, Metric, SummaryRecord};
use eeg_core::{EdfWriter, EegError, EegResult, FormatWriter};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files produced for one recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub container: PathBuf,
    pub band_powers: PathBuf,
    pub summary: PathBuf,
    pub report: PathBuf,
}

impl OutputPaths {
    pub fn for_input(input: &Path, output_dir: &Path) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        OutputPaths {
            container: output_dir
                .join(format!("{}.{}", stem, EdfWriter::new().default_extension())),
            band_powers: output_dir.join(format!("{}_band_powers.csv", stem)),
            summary: output_dir.join(format!("{}_summary.csv", stem)),
            report: output_dir.join(format!("{}_report.json", stem)),
        }
    }

    fn all(&self) -> [&Path; 4] {
        [
            self.container.as_path(),
            self.band_powers.as_path(),
            self.summary.as_path(),
            self.report.as_path(),
        ]
    }

    /// The same outputs under temporary `.partial` names in the same directory
    pub fn staging(&self) -> Self {
        fn partial(path: &Path) -> PathBuf {
            let mut name = path.as_os_str().to_os_string();
            name.push(".partial");
            PathBuf::from(name)
        }
        OutputPaths {
            container: partial(&self.container),
            band_powers: partial(&self.band_powers),
            summary: partial(&self.summary),
            report: partial(&self.report),
        }
    }

    /// Move every staged file onto its name in `target`
    ///
    /// On failure the files already moved and the remaining staged files are
    /// removed, so either all four outputs exist or none of them do.
    pub fn commit(&self, target: &OutputPaths) -> EegResult<()> {
        let pairs: Vec<(&Path, &Path)> = self.all().into_iter().zip(target.all()).collect();
        for (i, (staged, path)) in pairs.iter().enumerate() {
            if let Err(e) = std::fs::rename(staged, path) {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not move output into place, rolling back"
                );
                for (_, done) in &pairs[..i] {
                    let _ = std::fs::remove_file(done);
                }
                for (pending, _) in &pairs[i..] {
                    let _ = std::fs::remove_file(pending);
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Remove whichever of these files exist
    pub fn discard(&self) {
        for path in self.all() {
            if path.is_file() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

fn csv_error(e: csv::Error) -> EegError {
    EegError::Csv(e.to_string())
}

fn number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

/// One row per (kept epoch, channel)
pub fn write_band_powers<W: Write>(records: &[BandPowerRecord], writer: W) -> EegResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["epoch", "channel"];
    header.extend(Metric::ALL.iter().map(|m| m.column()));
    wtr.write_record(&header).map_err(csv_error)?;

    for record in records {
        let mut row = vec![record.epoch.to_string(), record.channel.label().to_string()];
        row.extend(Metric::ALL.iter().map(|&m| number(record.metrics.get(m))));
        wtr.write_record(&row).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per channel with mean and standard deviation of every metric
pub fn write_summary<W: Write>(summary: &SummaryRecord, writer: W) -> EegResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["channel".to_string()];
    for metric in Metric::ALL {
        header.push(format!("{}_mean", metric.column()));
        header.push(format!("{}_std", metric.column()));
    }
    header.extend(["original_epochs", "kept_epochs", "rejection_rate"].map(String::from));
    wtr.write_record(&header).map_err(csv_error)?;

    for channel in &summary.channels {
        let mut row = vec![channel.channel.label().to_string()];
        for metric in Metric::ALL {
            let stats = channel.metrics.get(metric);
            row.push(number(stats.mean));
            row.push(number(stats.std));
        }
        row.push(summary.original_epochs.to_string());
        row.push(summary.kept_epochs.to_string());
        row.push(number(summary.rejection_rate));
        wtr.write_record(&row).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_band_powers_file(records: &[BandPowerRecord], path: &Path) -> EegResult<()> {
    write_band_powers(records, BufWriter::new(File::create(path)?))?;
    debug!(path = %path.display(), rows = records.len(), "wrote band powers");
    Ok(())
}

pub fn write_summary_file(summary: &SummaryRecord, path: &Path) -> EegResult<()> {
    write_summary(summary, BufWriter::new(File::create(path)?))?;
    debug!(path = %path.display(), channels = summary.channels.len(), "wrote summary");
    Ok(())
}

/// Pretty-printed JSON of any serializable report
pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> EegResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| EegError::Json(format!("Failed to serialize report: {}", e)))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
