//! Error handling for the EEG pipeline
//!
//! Every stage reports failures through [`EegError`]. Errors are scoped to a
//! single recording: a batch caller can keep going after any of them except
//! configuration defects, which would fail every recording the same way.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type EegResult<T> = Result<T, EegError>;

/// Error type shared by every pipeline stage
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EegError {
    /// Structurally invalid or empty raw data
    #[error("Malformed input: {reason}")]
    MalformedInput {
        /// What was wrong with the input
        reason: String,
    },

    /// Filter or window parameters violating Nyquist or ordering constraints
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in the configuration
        name: &'static str,
        /// Why the value was refused
        reason: String,
    },

    /// Recording or epoch too short for the requested windowing
    #[error("Insufficient data: need {required} samples, have {available}")]
    InsufficientData {
        /// Samples the operation needs
        required: usize,
        /// Samples actually present
        available: usize,
    },

    /// Artifact rejection left nothing to analyse
    #[error("No valid epochs: all {original_epochs} epochs were rejected")]
    NoValidEpochs {
        /// Epoch count before rejection
        original_epochs: usize,
    },

    /// File system failure while reading or writing a recording
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular codec failure
    #[error("CSV error: {0}")]
    Csv(String),

    /// Configuration (de)serialization failure
    #[error("JSON error: {0}")]
    Json(String),
}

impl EegError {
    /// Shorthand for [`EegError::MalformedInput`]
    pub fn malformed(reason: impl Into<String>) -> Self {
        EegError::MalformedInput { reason: reason.into() }
    }

    /// Shorthand for [`EegError::InvalidParameter`]
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EegError::InvalidParameter { name, reason: reason.into() }
    }

    /// True when the error comes from configuration rather than from the data
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, EegError::InvalidParameter { .. } | EegError::Json(_))
    }
}
