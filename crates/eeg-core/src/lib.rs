//! EEG-Core: Foundation types for offline EEG analysis
//!
//! Data model shared by every pipeline stage: raw samples, the uniformly
//! sampled signal matrix, epochs, artifact verdicts, the error taxonomy and
//! the EDF container encoder.

pub mod eeg_types;
pub mod epoch;
pub mod error;
pub mod format;
pub mod quality;
pub mod signal_matrix;

pub use eeg_types::*;
pub use epoch::Epoch;
pub use error::{EegError, EegResult};
pub use format::{EdfWriter, FormatWriter};
pub use quality::{EpochQuality, QualityStatus};
pub use signal_matrix::*;
