//! ledfleet - leader-driven LED scheduling for a fleet of nodes
//!
//! One elected node tracks fleet membership through heartbeats and, on a
//! fixed tick, decides which members should have their LED lit. Members
//! that stop answering are evicted after a run of failed dispatches.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Node configuration (defaults, TOML file, environment)
//! - [`scheduler`] - LED pattern generators
//! - [`coordinator`] - Registry, leader engine, registerer, HTTP API
//! - [`actuator`] - Simulated and sysfs LEDs
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use ledfleet::config::NodeConfig;
//! use ledfleet::coordinator::NodeServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = NodeConfig::from_env()?;
//!     let server = NodeServer::new(config)?;
//!     server.start_with_shutdown(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod actuator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod scheduler;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actuator::{Actuator, SimulatedLed, SysfsLed};
    pub use crate::config::NodeConfig;
    pub use crate::coordinator::{
        HostRegistry, LeaderEngine, LeaderTracker, NodeServer, Registerer,
    };
    pub use crate::error::{Error, ErrorCategory, FleetErrorTrait, Result};
    pub use crate::scheduler::{PatternKind, Schedule};
}
