//! Unified error hierarchy for effortrs
//!
//! The analysis core reports failures through [`AnalysisError`]; file readers,
//! configuration and the CLI wrap everything in [`EffortError`] or `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all effortrs operations
#[derive(Debug, Error)]
pub enum EffortError {
    /// Signal analysis errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// File import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised by the EKG, power curve and zone calculations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The series is too short or too noisy for the requested computation
    #[error("Insufficient data for {calculation}: need at least {required}, found {found}")]
    InsufficientData {
        calculation: String,
        required: usize,
        found: usize,
    },

    /// Values existed but every one of them was rejected as implausible
    #[error("No valid data for {calculation}: {reason}")]
    NoValidData { calculation: String, reason: String },

    /// Invalid parameter
    #[error("Invalid parameter for {calculation}: {parameter}={value}")]
    InvalidParameter {
        calculation: String,
        parameter: String,
        value: String,
    },
}

impl AnalysisError {
    pub(crate) fn insufficient(calculation: &str, required: usize, found: usize) -> Self {
        AnalysisError::InsufficientData {
            calculation: calculation.to_string(),
            required,
            found,
        }
    }

    pub(crate) fn no_valid(calculation: &str, reason: impl Into<String>) -> Self {
        AnalysisError::NoValidData {
            calculation: calculation.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(
        calculation: &str,
        parameter: &str,
        value: impl ToString,
    ) -> Self {
        AnalysisError::InvalidParameter {
            calculation: calculation.to_string(),
            parameter: parameter.to_string(),
            value: value.to_string(),
        }
    }
}

/// Errors raised while turning activity or EKG files into traces
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Unsupported format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Format-specific parsing error
    #[error("Parse error in {format} at line {line}: {reason}")]
    ParseError {
        format: String,
        line: usize,
        reason: String,
    },

    /// Missing required column or field
    #[error("Missing required data: {field}")]
    MissingData { field: String },

    /// FIT decoding failed
    #[error("Corrupted FIT file {path}: {reason}")]
    CorruptedFit { path: PathBuf, reason: String },
}

/// Result type alias for the analysis core
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Result type alias for effortrs operations
pub type Result<T> = std::result::Result<T, EffortError>;

impl EffortError {
    /// Check if error is retryable
    ///
    /// Analysis is pure, so repeating it with the same input never helps.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EffortError::Io(_))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EffortError::Analysis(AnalysisError::InsufficientData { .. }) => ErrorSeverity::Warning,
            EffortError::Analysis(AnalysisError::NoValidData { .. }) => ErrorSeverity::Warning,
            EffortError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            EffortError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find file: {}", path.display())
            }
            EffortError::Analysis(AnalysisError::InsufficientData { calculation, .. }) => {
                format!(
                    "Not enough data to calculate {}. Please provide a longer or cleaner recording.",
                    calculation
                )
            }
            EffortError::Analysis(AnalysisError::NoValidData { calculation, .. }) => {
                format!(
                    "Every value for {} was rejected as implausible. The recording may be too noisy.",
                    calculation
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = EffortError::Analysis(AnalysisError::insufficient("heart rate", 2, 1));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = EffortError::Configuration("ekg.window_size must be at least 1".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_analysis_errors_are_not_retryable() {
        let err = EffortError::Analysis(AnalysisError::no_valid("heart rate", "all > 300"));
        assert!(!err.is_retryable());

        let err = EffortError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = EffortError::Import(ImportError::FileNotFound {
            path: PathBuf::from("ekg.txt"),
        });
        assert!(err.user_message().contains("Could not find"));

        let err = EffortError::Analysis(AnalysisError::insufficient("BPM series", 11, 4));
        assert!(err.user_message().contains("BPM series"));
    }

    #[test]
    fn test_insufficient_data_display() {
        let err = AnalysisError::insufficient("average heart rate", 2, 0);
        assert_eq!(
            err.to_string(),
            "Insufficient data for average heart rate: need at least 2, found 0"
        );
    }
}
