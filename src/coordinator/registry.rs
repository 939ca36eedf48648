//! Host registry for tracking fleet membership
//!
//! This module owns the leader-local view of which hosts exist, whether
//! they are still considered alive, and what LED state each was last
//! confirmed to have. It also records who the current leader is.
//!
//! Liveness is failure-counted: every failed dispatch bumps a host's
//! counter, every registration or successful dispatch resets it. A host
//! whose counter reaches `max_failures` drops out of [`HostRegistry::active_hosts`]
//! but stays in the map, so re-registering restores its last LED state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use url::Url;

/// Consecutive failures after which a host is no longer active
pub const DEFAULT_MAX_FAILURES: u32 = 5;

// ============================================================================
// Host
// ============================================================================

/// A registered fleet member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Unique member name
    pub name: String,

    /// Base URL of the member's HTTP endpoint
    pub url: String,

    /// Consecutive failed dispatches
    pub failures: u32,

    /// Last LED state confirmed by a successful dispatch
    pub led_state: bool,

    /// Last time the record changed
    pub last_updated: DateTime<Utc>,
}

impl Host {
    /// Create a new host record
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            failures: 0,
            led_state: false,
            last_updated: Utc::now(),
        }
    }

    /// Check whether the host is still below the failure threshold
    pub fn is_alive(&self, max_failures: u32) -> bool {
        self.failures < max_failures
    }

    /// Record a liveness signal
    fn refresh(&mut self) {
        self.failures = 0;
        self.last_updated = Utc::now();
    }

    /// Record a failed contact
    fn mark_unreachable(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.last_updated = Utc::now();
    }
}

// ============================================================================
// Registration Request
// ============================================================================

/// Body of `POST /leader/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Base URL the leader should dispatch to
    pub url: String,

    /// Member name; derived from the URL authority when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RegisterRequest {
    pub fn new(url: impl Into<String>, name: Option<String>) -> Self {
        Self {
            url: url.into(),
            name,
        }
    }

    /// Validate the request and resolve `(name, url)`.
    ///
    /// The URL must be absolute http(s) with a host. The returned URL has
    /// no trailing slash.
    pub fn resolve(&self) -> Result<(String, String), RegistryError> {
        let parsed =
            Url::parse(&self.url).map_err(|e| RegistryError::InvalidUrl(format!("{}: {e}", self.url)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.url
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| RegistryError::InvalidUrl(format!("{}: missing host", self.url)))?;

        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            Some(name) => return Err(RegistryError::InvalidName(name.to_string())),
            None => match parsed.port_or_known_default() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
        };

        Ok((name, self.url.trim_end_matches('/').to_string()))
    }
}

// ============================================================================
// Registration / status outcomes
// ============================================================================

/// What a registration did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterOutcome {
    /// First time this name was seen
    #[serde(rename = "new")]
    Joined,
    /// Known and alive; counted as a heartbeat
    Refreshed,
    /// Known but evicted; brought back with its previous LED state
    Rejoined,
}

impl RegisterOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Joined => "new",
            Self::Refreshed => "refreshed",
            Self::Rejoined => "rejoined",
        }
    }
}

/// Result of a status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Failure count after the update
    pub failures: u32,

    /// True when this update pushed the host over the failure threshold
    pub evicted: bool,
}

/// Per-host row served by the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostStats {
    pub name: String,
    pub state: bool,
    pub failures: u32,
    pub last_updated: DateTime<Utc>,
    /// Below the leader's eviction threshold
    pub alive: bool,
}

impl HostStats {
    fn from_host(host: &Host, max_failures: u32) -> Self {
        Self {
            name: host.name.clone(),
            state: host.led_state,
            failures: host.failures,
            last_updated: host.last_updated,
            alive: host.is_alive(max_failures),
        }
    }
}

// ============================================================================
// Host Registry
// ============================================================================

/// Registry of fleet members plus the current leader identity
pub struct HostRegistry {
    /// Known hosts by name
    hosts: RwLock<HashMap<String, Host>>,

    /// Name of the current leader, if known
    leader: RwLock<Option<String>>,

    /// This node's own name
    local_name: String,

    /// Failure threshold for liveness
    max_failures: u32,
}

impl HostRegistry {
    /// Create a new registry for the node called `local_name`
    pub fn new(local_name: impl Into<String>, max_failures: u32) -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
            leader: RwLock::new(None),
            local_name: local_name.into(),
            max_failures: max_failures.max(1),
        }
    }

    /// Registry using the default failure threshold
    pub fn with_defaults(local_name: impl Into<String>) -> Self {
        Self::new(local_name, DEFAULT_MAX_FAILURES)
    }

    /// This node's own name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Failure threshold for liveness
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// Join or refresh a host.
    ///
    /// Unknown names are created with zero failures. Known names have their
    /// failure count reset and URL updated; their LED state is kept.
    pub async fn register(
        &self,
        name: &str,
        url: &str,
    ) -> Result<RegisterOutcome, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let mut hosts = self.hosts.write().await;

        let outcome = match hosts.get_mut(name) {
            Some(host) => {
                let outcome = if host.is_alive(self.max_failures) {
                    RegisterOutcome::Refreshed
                } else {
                    RegisterOutcome::Rejoined
                };
                host.url = url.to_string();
                host.refresh();
                outcome
            }
            None => {
                hosts.insert(name.to_string(), Host::new(name, url));
                RegisterOutcome::Joined
            }
        };

        match outcome {
            RegisterOutcome::Refreshed => {
                tracing::debug!(host = %name, url = %url, "Host heartbeat")
            }
            _ => tracing::info!(host = %name, url = %url, outcome = outcome.as_str(), "Host registered"),
        }

        Ok(outcome)
    }

    /// Alive hosts sorted by name.
    ///
    /// Returns owned copies; callers never hold the lock while using them.
    pub async fn active_hosts(&self) -> Vec<Host> {
        let hosts = self.hosts.read().await;
        let mut active: Vec<Host> = hosts
            .values()
            .filter(|h| h.is_alive(self.max_failures))
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        active
    }

    /// Get a single host record
    pub async fn get_host(&self, name: &str) -> Option<Host> {
        self.hosts.read().await.get(name).cloned()
    }

    /// Record the outcome of contacting a host.
    ///
    /// Unreachable bumps the failure count. Reachable resets it and, when
    /// `led_state` is given, records the confirmed LED state.
    pub async fn update_status(
        &self,
        name: &str,
        reachable: bool,
        led_state: Option<bool>,
    ) -> Result<StatusUpdate, RegistryError> {
        let mut hosts = self.hosts.write().await;

        let host = hosts
            .get_mut(name)
            .ok_or_else(|| RegistryError::HostNotFound(name.to_string()))?;

        let was_alive = host.is_alive(self.max_failures);

        if reachable {
            host.refresh();
            if let Some(state) = led_state {
                host.led_state = state;
            }
        } else {
            host.mark_unreachable();
        }

        let evicted = was_alive && !host.is_alive(self.max_failures);
        if evicted {
            tracing::warn!(
                host = %name,
                failures = host.failures,
                "Host exceeded failure threshold, dropping from active set"
            );
        }

        Ok(StatusUpdate {
            failures: host.failures,
            evicted,
        })
    }

    /// Check whether a named host is currently active
    pub async fn is_alive(&self, name: &str) -> bool {
        self.hosts
            .read()
            .await
            .get(name)
            .is_some_and(|h| h.is_alive(self.max_failures))
    }

    /// Record who the leader is
    pub async fn set_leader(&self, name: Option<String>) {
        let mut leader = self.leader.write().await;
        if *leader != name {
            tracing::info!(
                previous = ?*leader,
                leader = ?name,
                local = %self.local_name,
                "Leader changed"
            );
            *leader = name;
        }
    }

    /// Current leader name, if known
    pub async fn leader(&self) -> Option<String> {
        self.leader.read().await.clone()
    }

    /// Whether this node is the current leader
    pub async fn is_leading(&self) -> bool {
        self.leader.read().await.as_deref() == Some(self.local_name.as_str())
    }

    /// Stats rows for every known host, sorted by name
    pub async fn stats(&self) -> Vec<HostStats> {
        let hosts = self.hosts.read().await;
        let mut rows: Vec<HostStats> = hosts
            .values()
            .map(|h| HostStats::from_host(h, self.max_failures))
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Aggregate counts
    pub async fn summary(&self) -> RegistrySummary {
        let hosts = self.hosts.read().await;

        let mut active = 0;
        let mut lit = 0;
        for host in hosts.values() {
            if host.is_alive(self.max_failures) {
                active += 1;
                if host.led_state {
                    lit += 1;
                }
            }
        }

        RegistrySummary {
            total_hosts: hosts.len(),
            active,
            evicted: hosts.len() - active,
            lit,
        }
    }
}

/// Registry aggregate counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub total_hosts: usize,
    pub active: usize,
    pub evicted: usize,
    pub lit: usize,
}

impl RegistrySummary {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Registry\n\
             {:-<30}\n\
             Known Hosts: {}\n\
             - Active: {}\n\
             - Evicted: {}\n\
             Lit: {}",
            "", self.total_hosts, self.active, self.evicted, self.lit
        )
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Empty or whitespace host name
    #[error("Invalid host name: '{0}'")]
    InvalidName(String),

    /// Malformed member URL
    #[error("Invalid host URL: {0}")]
    InvalidUrl(String),

    /// Host not found
    #[error("Host not found: {0}")]
    HostNotFound(String),
}

// ============================================================================
// Tests
// ============================================================================
