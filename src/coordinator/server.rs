//! Node server implementation
//!
//! This module wires one fleet node together: registry, scheduling engine,
//! registerer, leader tracker, actuator, and the HTTP router that exposes
//! them. Background loops share one shutdown channel with the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::actuator::{self, Actuator};
use crate::config::NodeConfig;

use super::api::create_router;
use super::client::{ClientConfig, FleetClient};
use super::election::LeaderTracker;
use super::engine::LeaderEngine;
use super::registerer::Registerer;
use super::registry::HostRegistry;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Host registry
    pub registry: Arc<HostRegistry>,

    /// Heartbeat client
    pub registerer: Arc<Registerer>,

    /// Leader identity sink
    pub tracker: Arc<LeaderTracker>,

    /// Local LED
    pub actuator: Arc<dyn Actuator>,

    /// Server start time
    pub start_time: Instant,
}

// ============================================================================
// Node Server
// ============================================================================

/// One fleet node
pub struct NodeServer {
    config: NodeConfig,
    state: AppState,
    engine: Arc<LeaderEngine>,
}

impl NodeServer {
    /// Create a new node from its configuration
    pub fn new(config: NodeConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|e| ServerError::Config(e.to_string()))?;

        let registry = Arc::new(HostRegistry::new(
            config.node_name.clone(),
            config.max_failures,
        ));

        let client = FleetClient::new(ClientConfig::default().with_timeout(config.request_timeout()))
            .map_err(|e| ServerError::Init(e.to_string()))?;

        let engine = Arc::new(LeaderEngine::new(
            registry.clone(),
            config.pattern.build(),
            Arc::new(client.clone()),
            config.tick_interval(),
        ));

        let registerer = Arc::new(
            Registerer::new(registry.clone(), client, config.effective_advertise_url())
                .with_intervals(config.heartbeat_interval(), config.retry_interval()),
        );

        let tracker = Arc::new(LeaderTracker::new(registry.clone(), registerer.clone()));

        let actuator: Arc<dyn Actuator> = Arc::from(actuator::from_path(config.led_path.as_deref()));

        let state = AppState {
            registry,
            registerer,
            tracker,
            actuator,
            start_time: Instant::now(),
        };

        Ok(Self {
            config,
            state,
            engine,
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Scheduling engine
    pub fn engine(&self) -> Arc<LeaderEngine> {
        self.engine.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Apply the statically configured leader, if any
    pub async fn apply_static_leader(&self) {
        if let Some(name) = &self.config.leader_name {
            self.state
                .tracker
                .on_new_leader(Some(name.clone()), self.config.effective_leader_url())
                .await;
        }
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {e}", self.config.bind_address)))
    }

    /// Start with graceful shutdown on the configured address
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener until `shutdown_signal` resolves
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(
            node = %self.config.node_name,
            %addr,
            pattern = %self.config.pattern,
            "Starting node server"
        );

        self.apply_static_leader().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = self.start_background_tasks(shutdown_rx);

        let result = axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));

        // Stop loops whether the server exited cleanly or not
        let _ = shutdown_tx.send(true);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }

        tracing::info!(node = %self.config.node_name, "Node server shutdown complete");
        result
    }

    /// Start the engine and registerer loops
    pub fn start_background_tasks(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let engine = tokio::spawn(self.engine.clone().run(shutdown.clone()));
        let registerer = tokio::spawn(self.state.registerer.clone().run(shutdown));

        tracing::info!("Background tasks started");
        vec![engine, registerer]
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            node_name: self.config.node_name.clone(),
            bind_address: self.config.bind_address,
            advertise_url: self.config.effective_advertise_url(),
            pattern: self.config.pattern.to_string(),
            actuator: self.state.actuator.name().to_string(),
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub node_name: String,
    pub bind_address: SocketAddr,
    pub advertise_url: String,
    pub pattern: String,
    pub actuator: String,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Node Server: {}\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Advertise URL: {}\n\
             Pattern: {}\n\
             LED: {}\n\
             Request Logging: {}",
            self.node_name,
            "",
            self.bind_address,
            self.advertise_url,
            self.pattern,
            self.actuator,
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

// ============================================================================
// Tests
// ============================================================================
