//! LED actuators
//!
//! The follower side of the fleet only needs one capability from its
//! hardware: switch the LED on or off. [`Actuator`] is that seam.
//!
//! - [`SimulatedLed`] keeps the state in memory and logs transitions.
//! - [`SysfsLed`] writes `1`/`0` to a Linux LED brightness file, e.g.
//!   `/sys/class/leds/led0/brightness` on a Raspberry Pi.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Result type for actuator operations
pub type ActuatorResult<T> = Result<T, ActuatorError>;

/// Errors raised while driving the LED
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    /// Writing the brightness file failed
    #[error("Failed to write LED state to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A binary output device
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Switch the LED on (`true`) or off (`false`)
    async fn set(&self, on: bool) -> ActuatorResult<()>;

    /// Last state successfully applied
    fn is_on(&self) -> bool;
}

// ============================================================================
// Simulated LED
// ============================================================================

/// In-memory LED, for development and tests
#[derive(Debug, Default)]
pub struct SimulatedLed {
    on: AtomicBool,
}

impl SimulatedLed {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Actuator for SimulatedLed {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn set(&self, on: bool) -> ActuatorResult<()> {
        let previous = self.on.swap(on, Ordering::SeqCst);
        if previous != on {
            tracing::info!(led = if on { "on" } else { "off" }, "LED switched");
        }
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Sysfs LED
// ============================================================================

/// LED driven through a sysfs brightness file
#[derive(Debug)]
pub struct SysfsLed {
    path: PathBuf,
    on: AtomicBool,
}

impl SysfsLed {
    /// Create an actuator writing to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            on: AtomicBool::new(false),
        }
    }

    /// Brightness file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Actuator for SysfsLed {
    fn name(&self) -> &str {
        "sysfs"
    }

    async fn set(&self, on: bool) -> ActuatorResult<()> {
        let value = if on { "1\n" } else { "0\n" };

        tokio::fs::write(&self.path, value)
            .await
            .map_err(|source| ActuatorError::Write {
                path: self.path.display().to_string(),
                source,
            })?;

        let previous = self.on.swap(on, Ordering::SeqCst);
        if previous != on {
            tracing::info!(
                led = if on { "on" } else { "off" },
                path = %self.path.display(),
                "LED switched"
            );
        }
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

/// Build the actuator for an optional brightness path
pub fn from_path(path: Option<&Path>) -> Box<dyn Actuator> {
    match path {
        Some(path) => Box::new(SysfsLed::new(path)),
        None => Box::new(SimulatedLed::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================
