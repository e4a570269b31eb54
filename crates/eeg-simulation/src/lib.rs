//! EEG-Simulation: deterministic synthetic recordings
//!
//! Produces raw timestamped sample streams in the acquisition CSV layout for
//! tests, demos and smoke runs of the pipeline.

pub mod recording_simulator;
pub mod signal_patterns;

pub use recording_simulator::*;
pub use signal_patterns::*;
