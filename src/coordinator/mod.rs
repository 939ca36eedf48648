//! Fleet coordination: membership, scheduling, and the node HTTP surface
//!
//! Every node runs the same components. Only the elected leader's engine
//! dispatches; everyone else just answers LED commands and heartbeats.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Node                     │
//! │                                          │
//! │  LeaderTracker ──► HostRegistry ◄──┐     │
//! │       │              ▲    │        │     │
//! │       ▼              │    ▼        │     │
//! │  Registerer     REST API  LeaderEngine   │
//! │   (heartbeat)        │    │  Schedule    │
//! │                      │    ▼              │
//! │                      │  FleetClient ─────┼──► followers
//! │                      ▼                   │
//! │                   Actuator (LED)         │
//! └──────────────────────────────────────────┘
//!
//!   POST   /leader/register   join / heartbeat (leader only)
//!   GET    /leader/stats      per-host state   (leader only)
//!   GET    /leader            current leader
//!   PUT    /leader            leader callback
//!   POST   /endpoint/led      LED on
//!   DELETE /endpoint/led      LED off
//!   GET    /healthz           200 while registered
//!   GET    /metrics           Prometheus text
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ledfleet::config::NodeConfig;
//! use ledfleet::coordinator::NodeServer;
//!
//! let config = NodeConfig::from_env()?;
//! let server = NodeServer::new(config)?;
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod client;
pub mod election;
pub mod engine;
pub mod registerer;
pub mod registry;
pub mod server;

// Re-export main types
pub use client::{ClientConfig, ClientError, FleetClient};
pub use election::{LeaderInfo, LeaderTracker};
pub use engine::{Dispatcher, EngineState, LeaderEngine, TickOutcome, TickReport};
pub use registerer::{RegistrationError, Registerer};
pub use registry::{Host, HostRegistry, HostStats, RegisterRequest, RegistryError};
pub use server::{AppState, NodeServer, ServerError};
