use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "eegpipe",
    version,
    about = "Offline EEG analysis: resampling, artifact rejection and band powers",
    long_about = "Turn raw four-channel EEG recordings (timestamp_ms, TP9, AF7, AF8, TP10) into\n\
                  an EDF container, per-epoch band powers and per-channel summaries."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process one recording
    Process(ProcessArgs),
    /// Process every matching recording in a directory
    Batch(BatchArgs),
    /// Write a synthetic recording in the acquisition CSV layout
    Simulate(SimulateArgs),
}

/// Settings shared by `process` and `batch`
#[derive(Args, Clone)]
pub struct PipelineArgs {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Analyse only the first N seconds
    #[arg(long, value_name = "N")]
    pub seconds: Option<f64>,

    /// Comma-separated active channels, e.g. AF7,AF8
    #[arg(long)]
    pub channels: Option<String>,

    /// Uniform sample rate in Hz (default: inferred and snapped to 250/256/500/512)
    #[arg(long, value_name = "HZ")]
    pub target_rate: Option<f64>,
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Raw recording CSV
    pub input: PathBuf,

    /// Output directory (default: the input's directory)
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing raw recordings
    pub input_dir: PathBuf,

    /// Output directory (default: <input_dir>/results)
    pub output_dir: Option<PathBuf>,

    /// File name pattern inside the input directory
    #[arg(long, default_value = "eeg_recording_*.csv")]
    pub pattern: String,

    /// Recordings processed concurrently (default: available parallelism)
    #[arg(long)]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Destination CSV
    pub output: PathBuf,

    /// Length in seconds
    #[arg(long, default_value_t = 10.0)]
    pub duration: f64,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 256.0)]
    pub rate: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Uniform timestamp jitter in milliseconds
    #[arg(long, default_value_t = 0.0)]
    pub jitter_ms: f64,

    /// Start second of a 0.5 s, 500 uV artifact burst
    #[arg(long)]
    pub burst_at: Option<f64>,

    /// Standard deviation of Gaussian background activity in uV
    #[arg(long, default_value_t = 0.0)]
    pub noise_uv: f64,
}
