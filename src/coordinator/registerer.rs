//! Membership heartbeat client
//!
//! Every node, the leader included, runs a [`Registerer`]. It keeps the
//! node registered with whoever currently leads:
//!
//! - registered: heartbeat again after `interval`
//! - not registered (failure, or no leader known): retry after `retry_interval`
//!
//! When this node is the leader the registration goes straight into the
//! local registry. Changing the leader URL drops the registered flag and
//! wakes the loop, since a new leader has never heard of this node.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify, RwLock};

use crate::metrics;

use super::client::{ClientError, FleetClient};
use super::registry::{HostRegistry, RegisterRequest, RegistryError};

/// Default steady-state heartbeat interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Default retry interval while unregistered
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Why a registration attempt failed
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// No leader URL known yet
    #[error("No leader known")]
    NoLeader,

    /// Remote registration failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Local registration rejected
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Keeps this node registered with the current leader
pub struct Registerer {
    /// Name this node registers under
    name: String,

    /// URL the leader dispatches to
    advertise_url: String,

    /// Current leader base URL
    leader_url: RwLock<Option<String>>,

    /// Whether the last attempt succeeded
    registered: AtomicBool,

    /// Bumped on every leader change; stale attempts are discarded
    generation: AtomicU64,

    /// Local registry, used directly while leading
    registry: Arc<HostRegistry>,

    client: FleetClient,

    interval: Duration,
    retry_interval: Duration,

    /// Wakes the loop early after a leader change
    wake: Notify,
}

impl Registerer {
    /// Create a registerer for this node
    pub fn new(
        registry: Arc<HostRegistry>,
        client: FleetClient,
        advertise_url: impl Into<String>,
    ) -> Self {
        Self {
            name: registry.local_name().to_string(),
            advertise_url: advertise_url.into(),
            leader_url: RwLock::new(None),
            registered: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            registry,
            client,
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            wake: Notify::new(),
        }
    }

    /// Set heartbeat and retry intervals
    pub fn with_intervals(mut self, interval: Duration, retry_interval: Duration) -> Self {
        self.interval = interval;
        self.retry_interval = retry_interval;
        self
    }

    /// Name this node registers under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the last registration attempt succeeded
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Current leader URL
    pub async fn leader_url(&self) -> Option<String> {
        self.leader_url.read().await.clone()
    }

    /// Point the registerer at a new leader.
    ///
    /// Empty strings clear the leader. A changed URL resets the registered
    /// flag and triggers an immediate attempt.
    pub async fn set_leader_url(&self, url: Option<String>) {
        let url = url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let mut current = self.leader_url.write().await;
        if *current == url {
            return;
        }

        tracing::info!(previous = ?*current, leader_url = ?url, "Leader URL changed");
        *current = url;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set_registered(false);
        drop(current);

        self.wake.notify_one();
    }

    /// Make one registration attempt
    pub async fn register(&self) -> Result<(), RegistrationError> {
        if self.registry.is_leading().await {
            self.registry
                .register(&self.name, &self.advertise_url)
                .await?;
            return Ok(());
        }

        let leader_url = self.leader_url().await.ok_or(RegistrationError::NoLeader)?;
        let request = RegisterRequest::new(self.advertise_url.clone(), Some(self.name.clone()));

        self.client.register(&leader_url, &request).await?;
        Ok(())
    }

    /// Register repeatedly until `shutdown` turns true
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            node = %self.name,
            advertise_url = %self.advertise_url,
            interval_secs = self.interval.as_secs(),
            "Registerer started"
        );

        loop {
            let ok = self.heartbeat().await;
            let delay = if ok { self.interval } else { self.retry_interval };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Registerer stopped");
    }

    /// One attempt whose outcome updates the registered flag.
    ///
    /// If the leader changes while the attempt is in flight the outcome
    /// belongs to the old leader and is dropped. Returns whether the
    /// attempt itself succeeded.
    pub async fn heartbeat(&self) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);

        let ok = match self.register().await {
            Ok(()) => true,
            Err(RegistrationError::NoLeader) => false,
            Err(e) => {
                if self.is_registered() {
                    tracing::warn!(error = %e, "Registration with leader failed");
                } else {
                    tracing::debug!(error = %e, "Registration attempt failed");
                }
                false
            }
        };

        metrics::record_heartbeat(ok);

        // Hold the lock so a concurrent leader change cannot interleave
        let _leader = self.leader_url.read().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.set_registered(ok);
        } else {
            tracing::debug!(node = %self.name, "Leader changed mid-attempt, result dropped");
        }
        ok
    }

    fn set_registered(&self, registered: bool) {
        let previous = self.registered.swap(registered, Ordering::SeqCst);
        if previous != registered {
            if registered {
                tracing::info!(node = %self.name, "Registered with leader");
            } else {
                tracing::info!(node = %self.name, "Not registered with leader");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
