use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use ledfleet::config::NodeConfig;
use ledfleet::coordinator::NodeServer;
use ledfleet::error::{Error as FleetError, FleetErrorTrait};
use ledfleet::scheduler::PatternKind;

/// Command-line overrides for `serve`
#[derive(Debug, Default)]
pub struct ServeParams {
    pub config: Option<PathBuf>,
    pub name: Option<String>,
    pub bind: Option<SocketAddr>,
    pub advertise_url: Option<String>,
    pub leader_name: Option<String>,
    pub leader_url: Option<String>,
    pub pattern: Option<PatternKind>,
    pub tick_interval_ms: Option<u64>,
    pub led_path: Option<PathBuf>,
    pub no_request_logging: bool,
}

impl ServeParams {
    /// Apply flags on top of a file/env config
    fn apply(self, config: &mut NodeConfig) {
        if let Some(name) = self.name {
            config.node_name = name;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(url) = self.advertise_url {
            config.advertise_url = Some(url);
        }
        if let Some(name) = self.leader_name {
            config.leader_name = Some(name);
        }
        if let Some(url) = self.leader_url {
            config.leader_url = Some(url);
        }
        if let Some(pattern) = self.pattern {
            config.pattern = pattern;
        }
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval_ms = ms;
        }
        if let Some(path) = self.led_path {
            config.led_path = Some(path);
        }
        if self.no_request_logging {
            config.enable_request_logging = false;
        }
    }
}

/// Merge file, environment and flags into a validated node
fn build_node(params: ServeParams) -> ledfleet::Result<NodeServer> {
    let mut config = NodeConfig::load(params.config.as_deref())?;
    params.apply(&mut config);
    Ok(NodeServer::new(config)?)
}

fn report(err: FleetError) -> anyhow::Error {
    tracing::error!(
        category = err.category().as_str(),
        recoverable = err.is_recoverable(),
        error = %err,
        "Node failed"
    );
    anyhow::Error::new(err)
}

/// Run a fleet node until Ctrl+C
pub async fn serve(params: ServeParams) -> Result<()> {
    if let Err(e) = ledfleet::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed; continuing without metrics");
    }

    let server = build_node(params)
        .map_err(report)
        .context("Failed to start node")?;

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    println!("  POST   /leader/register  - Join or heartbeat (leader only)");
    println!("  GET    /leader/stats     - Per-host state (leader only)");
    println!("  GET    /leader           - Current leader");
    println!("  PUT    /leader           - Report a new leader");
    println!("  POST   /endpoint/led     - Turn LED on");
    println!("  DELETE /endpoint/led     - Turn LED off");
    println!("  GET    /endpoint/led     - Current LED state");
    println!("  GET    /healthz          - Registration health");
    println!("  GET    /metrics          - Prometheus metrics");
    println!();
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await
        .map_err(|e| report(e.into()))?;

    println!("Node stopped.");
    Ok(())
}
