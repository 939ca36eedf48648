//! Leader scheduling engine
//!
//! While this node is the leader, every tick:
//!
//! 1. reads the active hosts (sorted by name) from the registry,
//! 2. asks the pattern for one desired state per host,
//! 3. dispatches a state change to every host whose recorded LED state
//!    differs, all at once,
//! 4. waits for every dispatch to finish,
//! 5. feeds each outcome back into the registry.
//!
//! Failed hosts are not retried within a tick. Their failure counters grow
//! until the registry stops listing them.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

use crate::metrics;
use crate::scheduler::Schedule;

use super::client::ClientError;
use super::registry::{Host, HostRegistry};

// ============================================================================
// Dispatcher
// ============================================================================

/// Sends a desired LED state to one host
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Switch `host`'s LED; any error counts as the host being unreachable
    async fn dispatch(&self, host: &Host, on: bool) -> Result<(), ClientError>;
}

// ============================================================================
// Engine types
// ============================================================================

/// Whether the engine is currently driving the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Not the leader; registrations still accepted, nothing dispatched
    Idle,
    /// Leader; ticks dispatch state changes
    Leading,
}

/// One state change to send this tick
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub host: Host,
    pub desired: bool,
}

/// Summary of a tick that dispatched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Active hosts considered
    pub hosts: usize,
    /// State changes sent
    pub dispatched: usize,
    /// Changes confirmed by the host
    pub succeeded: usize,
    /// Changes that failed
    pub failed: usize,
    /// Hosts this tick pushed over the failure threshold
    pub evicted: usize,
    /// Hosts the pattern wants lit, in name order
    pub desired_on: Vec<String>,
}

/// What a tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not leading
    Idle,
    /// Leading, but nobody is registered
    NoHosts,
    /// Pattern advanced; changes (possibly none) were dispatched
    Dispatched(TickReport),
}

// ============================================================================
// Leader Engine
// ============================================================================

/// Fixed-interval scheduling loop run by the leader
pub struct LeaderEngine {
    registry: Arc<HostRegistry>,
    schedule: Mutex<Box<dyn Schedule>>,
    dispatcher: Arc<dyn Dispatcher>,
    tick_interval: Duration,
    was_leading: AtomicBool,
}

impl LeaderEngine {
    /// Create a new engine
    pub fn new(
        registry: Arc<HostRegistry>,
        schedule: Box<dyn Schedule>,
        dispatcher: Arc<dyn Dispatcher>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            registry,
            schedule: Mutex::new(schedule),
            dispatcher,
            tick_interval,
            was_leading: AtomicBool::new(false),
        }
    }

    /// Current engine state, derived from the registry's leader identity
    pub async fn state(&self) -> EngineState {
        if self.registry.is_leading().await {
            EngineState::Leading
        } else {
            EngineState::Idle
        }
    }

    /// Tick interval
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Run one scheduling round
    pub async fn tick(&self) -> TickOutcome {
        let state = self.state().await;
        self.log_transition(state);

        if state == EngineState::Idle {
            return TickOutcome::Idle;
        }

        metrics::record_tick();

        let hosts = self.registry.active_hosts().await;
        if hosts.is_empty() {
            tracing::debug!("No active hosts, skipping tick");
            return TickOutcome::NoHosts;
        }

        let desired = self.schedule.lock().await.next(hosts.len());

        let desired_on: Vec<String> = hosts
            .iter()
            .zip(&desired)
            .filter(|(_, on)| **on)
            .map(|(host, _)| host.name.clone())
            .collect();

        let actions: Vec<Action> = hosts
            .iter()
            .zip(desired)
            .filter(|(host, on)| host.led_state != *on)
            .map(|(host, on)| Action {
                host: host.clone(),
                desired: on,
            })
            .collect();

        let futures = actions.iter().map(|action| async move {
            let result = self.dispatcher.dispatch(&action.host, action.desired).await;
            (action, result)
        });
        let results = futures::future::join_all(futures).await;

        let mut report = TickReport {
            hosts: hosts.len(),
            dispatched: actions.len(),
            desired_on,
            ..Default::default()
        };

        for (action, result) in results {
            let name = action.host.name.as_str();
            let update = match result {
                Ok(()) => {
                    report.succeeded += 1;
                    metrics::record_dispatch(true);
                    self.registry
                        .update_status(name, true, Some(action.desired))
                        .await
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::record_dispatch(false);
                    tracing::warn!(
                        host = %name,
                        url = %action.host.url,
                        desired = action.desired,
                        error = %e,
                        "Dispatch failed"
                    );
                    self.registry.update_status(name, false, None).await
                }
            };

            match update {
                Ok(status) if status.evicted => report.evicted += 1,
                Ok(_) => {}
                // Host vanished mid-tick
                Err(e) => tracing::debug!(host = %name, error = %e, "Dropping dispatch result"),
            }
        }

        metrics::update_registry(&self.registry.summary().await);

        tracing::debug!(
            hosts = report.hosts,
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed,
            evicted = report.evicted,
            lit = ?report.desired_on,
            "Tick complete"
        );

        TickOutcome::Dispatched(report)
    }

    /// Tick on a fixed interval until `shutdown` turns true.
    ///
    /// A tick in progress always finishes; slow hosts delay the next tick.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "Leader engine started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Leader engine stopped");
    }

    fn log_transition(&self, state: EngineState) {
        let leading = state == EngineState::Leading;
        if self.was_leading.swap(leading, Ordering::SeqCst) != leading {
            if leading {
                tracing::info!(node = %self.registry.local_name(), "Now leading, dispatch enabled");
            } else {
                tracing::info!(node = %self.registry.local_name(), "No longer leading, dispatch paused");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::PatternKind;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    /// Records every dispatch; fails for names in `failing`
    #[derive(Default)]
    struct RecordingDispatcher {
        calls: StdMutex<Vec<(String, bool)>>,
        failing: HashSet<String>,
    }

    impl RecordingDispatcher {
        fn failing(names: &[&str]) -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                failing: names.iter().map(|n| n.to_string()).collect(),
            }
        }

        fn take_calls(&self) -> Vec<(String, bool)> {
            let mut calls = std::mem::take(&mut *self.calls.lock().unwrap());
            calls.sort();
            calls
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn dispatch(&self, host: &Host, on: bool) -> Result<(), ClientError> {
            self.calls.lock().unwrap().push((host.name.clone(), on));
            if self.failing.contains(&host.name) {
                Err(ClientError::Network("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    async fn leading_registry(hosts: &[&str]) -> Arc<HostRegistry> {
        let registry = Arc::new(HostRegistry::with_defaults("leader"));
        registry.set_leader(Some("leader".to_string())).await;
        for name in hosts {
            registry
                .register(name, &format!("http://{name}:8080"))
                .await
                .unwrap();
        }
        registry
    }

    fn engine(
        registry: Arc<HostRegistry>,
        kind: PatternKind,
        dispatcher: Arc<RecordingDispatcher>,
    ) -> LeaderEngine {
        LeaderEngine::new(registry, kind.build(), dispatcher, Duration::from_millis(10))
    }

    async fn lit_hosts(registry: &HostRegistry) -> Vec<String> {
        registry
            .active_hosts()
            .await
            .into_iter()
            .filter(|h| h.led_state)
            .map(|h| h.name)
            .collect()
    }

    #[tokio::test]
    async fn test_idle_engine_does_not_dispatch() {
        let registry = Arc::new(HostRegistry::with_defaults("follower"));
        registry.register("pi1", "http://pi1:8080").await.unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = engine(registry, PatternKind::Linear, dispatcher.clone());

        assert_eq!(engine.state().await, EngineState::Idle);
        assert_eq!(engine.tick().await, TickOutcome::Idle);
        assert!(dispatcher.take_calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry_skips_tick() {
        let registry = leading_registry(&[]).await;
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = engine(registry, PatternKind::Linear, dispatcher);

        assert_eq!(engine.tick().await, TickOutcome::NoHosts);
    }

    #[tokio::test]
    async fn test_linear_rotation_visits_each_host_once() {
        let registry = leading_registry(&["host1", "host2", "host3", "host4"]).await;
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = engine(registry.clone(), PatternKind::Linear, dispatcher);

        let mut lit = Vec::new();
        for _ in 0..4 {
            assert!(matches!(engine.tick().await, TickOutcome::Dispatched(_)));
            let on = lit_hosts(&registry).await;
            assert_eq!(on.len(), 1, "exactly one host lit per tick");
            lit.push(on[0].clone());
        }

        let unique: HashSet<_> = lit.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(lit, vec!["host2", "host3", "host4", "host1"]);
    }

    #[tokio::test]
    async fn test_only_changed_hosts_are_dispatched() {
        let registry = leading_registry(&["a", "b", "c"]).await;
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = engine(registry, PatternKind::Linear, dispatcher.clone());

        // First tick: b on; a and c already off
        engine.tick().await;
        assert_eq!(dispatcher.take_calls(), vec![("b".to_string(), true)]);

        // Second tick: b off, c on
        let outcome = engine.tick().await;
        assert_eq!(
            dispatcher.take_calls(),
            vec![("b".to_string(), false), ("c".to_string(), true)]
        );
        match outcome {
            TickOutcome::Dispatched(report) => {
                assert_eq!(report.hosts, 3);
                assert_eq!(report.dispatched, 2);
                assert_eq!(report.succeeded, 2);
                assert_eq!(report.desired_on, vec!["c"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_counts_only_target() {
        let registry = leading_registry(&["a", "b", "c"]).await;
        let dispatcher = Arc::new(RecordingDispatcher::failing(&["b"]));
        let engine = engine(registry.clone(), PatternKind::Linear, dispatcher);

        let outcome = engine.tick().await;
        assert!(matches!(
            outcome,
            TickOutcome::Dispatched(TickReport { failed: 1, succeeded: 0, .. })
        ));

        let b = registry.get_host("b").await.unwrap();
        assert_eq!(b.failures, 1);
        assert!(!b.led_state);
        assert_eq!(registry.get_host("a").await.unwrap().failures, 0);
        assert_eq!(registry.get_host("c").await.unwrap().failures, 0);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_evicted_across_ticks() {
        let registry = leading_registry(&["a"]).await;
        let dispatcher = Arc::new(RecordingDispatcher::failing(&["a"]));
        // Single host: linear keeps wanting it lit, so every tick dispatches
        let engine = engine(registry.clone(), PatternKind::Linear, dispatcher.clone());

        for _ in 0..4 {
            engine.tick().await;
        }
        assert!(matches!(
            engine.tick().await,
            TickOutcome::Dispatched(TickReport { evicted: 1, .. })
        ));

        assert!(registry.active_hosts().await.is_empty());
        assert_eq!(dispatcher.take_calls().len(), 5);
        assert_eq!(engine.tick().await, TickOutcome::NoHosts);
    }

    #[tokio::test]
    async fn test_alternating_sequence() {
        let registry = leading_registry(&["host1", "host2", "host3", "host4"]).await;
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = engine(registry.clone(), PatternKind::Alternating, dispatcher);

        let mut sequence = Vec::new();
        for _ in 0..8 {
            engine.tick().await;
            sequence.extend(lit_hosts(&registry).await);
        }

        assert_eq!(
            sequence,
            vec!["host1", "host2", "host3", "host4", "host3", "host2", "host1", "host2"]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let registry = leading_registry(&["a", "b"]).await;
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = Arc::new(engine(registry, PatternKind::Linear, dispatcher.clone()));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(engine.clone().run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine loop should stop")
            .unwrap();
        assert!(!dispatcher.take_calls().is_empty());
    }
}
