//! Prometheus metrics for ledfleet nodes
//!
//! This module provides metrics tracking for:
//! - Leader: registry size, ticks, dispatch results, registrations received
//! - Every node: heartbeat attempts, local LED state
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};
use std::sync::OnceLock;

use crate::coordinator::registry::RegistrySummary;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all node metrics
struct FleetMetrics {
    registered_hosts: Gauge,
    active_hosts: Gauge,
    led_state: Gauge,
    ticks: Counter,
    dispatches: CounterVec,
    registrations: CounterVec,
    heartbeats: CounterVec,
}

/// Global storage for node metrics
static FLEET_METRICS: OnceLock<FleetMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = ledfleet::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = FleetMetrics {
        registered_hosts: register_gauge!(
            "ledfleet_registered_hosts",
            "Number of hosts known to the leader registry"
        )?,
        active_hosts: register_gauge!(
            "ledfleet_active_hosts",
            "Number of hosts below the failure threshold"
        )?,
        led_state: register_gauge!(
            "ledfleet_led_state",
            "LED state of this node (1 = on, 0 = off)"
        )?,
        ticks: register_counter!(
            "ledfleet_ticks_total",
            "Total scheduling ticks run while leading"
        )?,
        dispatches: register_counter_vec!(
            "ledfleet_dispatches_total",
            "Total LED state dispatches by result",
            &["result"]
        )?,
        registrations: register_counter_vec!(
            "ledfleet_registrations_total",
            "Total registrations received by outcome",
            &["outcome"]
        )?,
        heartbeats: register_counter_vec!(
            "ledfleet_heartbeats_total",
            "Total registration attempts made by this node by result",
            &["result"]
        )?,
    };

    FLEET_METRICS
        .set(metrics)
        .map_err(|_| "Fleet metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    FLEET_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn result_label(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

/// Record one leading tick
pub fn record_tick() {
    if let Some(m) = FLEET_METRICS.get() {
        m.ticks.inc();
    }
}

/// Record one dispatch outcome
pub fn record_dispatch(ok: bool) {
    if let Some(m) = FLEET_METRICS.get() {
        m.dispatches.with_label_values(&[result_label(ok)]).inc();
    }
}

/// Record a registration received by the leader (`new`, `refreshed`, `rejoined`, `rejected`)
pub fn record_registration(outcome: &str) {
    if let Some(m) = FLEET_METRICS.get() {
        m.registrations.with_label_values(&[outcome]).inc();
    }
}

/// Record one registration attempt made by this node
pub fn record_heartbeat(ok: bool) {
    if let Some(m) = FLEET_METRICS.get() {
        m.heartbeats.with_label_values(&[result_label(ok)]).inc();
    }
}

/// Update registry gauges
pub fn update_registry(summary: &RegistrySummary) {
    let Some(m) = FLEET_METRICS.get() else {
        return;
    };

    m.registered_hosts.set(summary.total_hosts as f64);
    m.active_hosts.set(summary.active as f64);
}

/// Update the local LED gauge
pub fn set_led_state(on: bool) {
    if let Some(m) = FLEET_METRICS.get() {
        m.led_state.set(if on { 1.0 } else { 0.0 });
    }
}

// ============================================================================
// Tests
// ============================================================================
