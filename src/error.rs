//! Unified error handling for the ledfleet crate
//!
//! Each module owns a domain error (`RegistryError`, `ClientError`, ...).
//! [`Error`] wraps all of them for code that crosses module boundaries,
//! such as the CLI commands.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ledfleet::error::{Error, FleetErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err);
//!     } else {
//!         eprintln!("Fatal error ({:?}): {}", err.category(), err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::actuator::ActuatorError;
pub use crate::config::ConfigError;
pub use crate::coordinator::client::ClientError;
pub use crate::coordinator::registerer::RegistrationError;
pub use crate::coordinator::registry::RegistryError;
pub use crate::coordinator::server::ServerError;
pub use crate::scheduler::error::SchedulerError;

/// Common interface for ledfleet errors
pub trait FleetErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Node-to-node HTTP errors
    Network,
    /// Configuration and validation errors
    Config,
    /// Pattern selection errors
    Scheduler,
    /// LED hardware errors
    Actuator,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Config => "config",
            Self::Scheduler => "scheduler",
            Self::Actuator => "actuator",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the ledfleet crate
#[derive(Error, Debug)]
pub enum Error {
    /// Membership errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Pattern errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Outbound HTTP errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Heartbeat errors
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// LED errors
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Server startup and serve errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl FleetErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Registry(_) => false,
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Client(e) => e.is_recoverable(),
            Self::Registration(e) => match e {
                RegistrationError::NoLeader => true,
                RegistrationError::Client(e) => e.is_recoverable(),
                RegistrationError::Registry(_) => false,
            },
            Self::Actuator(_) => true, // sysfs writes can fail transiently
            Self::Config(_) => false,
            Self::Server(e) => matches!(e, ServerError::Bind(_)),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Other(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(_) | Self::Registration(_) => ErrorCategory::Network,
            Self::Registry(_) | Self::Json(_) => ErrorCategory::Other,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Actuator(_) => ErrorCategory::Actuator,
            Self::Config(_) => ErrorCategory::Config,
            Self::Server(e) => match e {
                ServerError::Config(_) => ErrorCategory::Config,
                ServerError::Bind(_) | ServerError::Serve(_) => ErrorCategory::Network,
                ServerError::Init(_) => ErrorCategory::Other,
            },
            Self::Io(_) | Self::Other(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
