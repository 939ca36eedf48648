//! Leader identity sink
//!
//! Who leads is decided outside this crate: a static configuration value,
//! a lease held in some external store, or an operator. Whatever decides
//! it reports the result through [`LeaderTracker::on_new_leader`], which
//! fans the change out to the registry (engine state follows from it) and
//! to the registerer (which must re-join under the new leader).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::registerer::Registerer;
use super::registry::HostRegistry;

/// Current leader as seen by this node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderInfo {
    /// Leader node name
    pub name: Option<String>,

    /// Leader base URL
    pub url: Option<String>,

    /// Whether this node is the leader
    #[serde(default)]
    pub leading: bool,
}

/// Applies leader changes to the local node
pub struct LeaderTracker {
    registry: Arc<HostRegistry>,
    registerer: Arc<Registerer>,
}

impl LeaderTracker {
    pub fn new(registry: Arc<HostRegistry>, registerer: Arc<Registerer>) -> Self {
        Self {
            registry,
            registerer,
        }
    }

    /// Callback for whatever elects the leader.
    ///
    /// `None` (or an empty string) means no leader is currently known.
    pub async fn on_new_leader(&self, name: Option<String>, url: Option<String>) {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let leading = name.as_deref() == Some(self.registry.local_name());
        tracing::info!(
            leader = ?name,
            leader_url = ?url,
            leading,
            "New leader reported"
        );

        self.registry.set_leader(name).await;
        self.registerer.set_leader_url(url).await;
    }

    /// Snapshot of the current leader
    pub async fn current(&self) -> LeaderInfo {
        LeaderInfo {
            name: self.registry.leader().await,
            url: self.registerer.leader_url().await,
            leading: self.registry.is_leading().await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
