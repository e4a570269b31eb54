pub mod batch;
pub mod process;
pub mod simulate;

use crate::cli::PipelineArgs;
use crate::exit_codes;
use anyhow::Context;
use eeg_core::{EegError, Electrode};
use eeg_processing::{Metric, PipelineConfig, RunReport, SummaryRecord};

/// Configuration file (or defaults) with command-line overrides applied
pub fn build_config(args: &PipelineArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(seconds) = args.seconds {
        config.max_duration_s = Some(seconds);
    }
    if let Some(list) = &args.channels {
        config.channels = Electrode::parse_list(list).context("Invalid --channels")?;
    }
    if let Some(rate) = args.target_rate {
        config.target_rate_hz = Some(rate);
    }

    config.validate()?;
    Ok(config)
}

/// Exit status for an error raised while processing a recording
pub fn exit_code_for(error: &EegError) -> i32 {
    if error.is_configuration_defect() {
        exit_codes::USAGE_ERROR
    } else {
        exit_codes::RECORDING_FAILURE
    }
}

fn cell(value: f64) -> String {
    format!("{:>11.4}", value)
}

/// Human-readable result table on stdout
pub fn print_summary(report: &RunReport, summary: &SummaryRecord) {
    let name = report
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!(
        "{}: {}/{} epochs kept (rejection rate {:.1}%), {} Hz{}, {:.1} s analysed",
        name,
        summary.kept_epochs,
        summary.original_epochs,
        summary.rejection_rate * 100.0,
        report.target_rate_hz,
        if report.resampled { " (resampled)" } else { "" },
        report.analysed_duration_s
    );

    let header: String = Metric::ALL.iter().map(|m| format!("{:>11}", m.column())).collect();
    println!("{:<8}{}", "channel", header);
    for channel in &summary.channels {
        let row: String = Metric::ALL.iter().map(|&m| cell(channel.metrics.get(m).mean)).collect();
        println!("{:<8}{}", channel.channel.label(), row);
    }
    let average: String =
        Metric::ALL.iter().map(|&m| cell(summary.channel_average.get(m))).collect();
    println!("{:<8}{}", "average", average);

    if let Some(dir) = report.outputs.container.parent() {
        println!("Outputs written to {}", dir.display());
    }
}
