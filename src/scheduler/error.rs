//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Unknown pattern name provided
    UnknownPattern {
        name: String,
        valid_options: Vec<String>,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPattern {
                name,
                valid_options,
            } => {
                write!(
                    f,
                    "Unknown pattern '{}'. Valid options: {}",
                    name,
                    valid_options.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an unknown pattern error
    pub fn unknown_pattern(name: impl Into<String>) -> Self {
        Self::UnknownPattern {
            name: name.into(),
            valid_options: super::pattern::PatternKind::all()
                .iter()
                .map(|k| k.id().to_string())
                .collect(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        false
    }
}
