//! Multi-node fleet tests
//!
//! 1. A hand-driven leader engine dispatching to real follower nodes
//! 2. A self-organizing fleet: followers join a leader via heartbeats

use std::sync::Arc;
use std::time::Duration;

use ledfleet::coordinator::{
    ClientConfig, FleetClient, HostRegistry, HostStats, LeaderEngine, TickOutcome,
};
use ledfleet::scheduler::PatternKind;

use super::fixtures::{eventually, http, LeaderSetup, TestNode};

async fn spawn_followers(count: usize) -> Vec<TestNode> {
    let mut nodes = Vec::with_capacity(count);
    for i in 1..=count {
        nodes.push(TestNode::spawn(&format!("host{i}"), LeaderSetup::None, PatternKind::Linear).await);
    }
    nodes
}

fn lit(nodes: &[TestNode]) -> Vec<String> {
    nodes
        .iter()
        .filter(|n| n.state.actuator.is_on())
        .map(|n| n.name.clone())
        .collect()
}

// ============================================================================
// Hand-driven engine
// ============================================================================

#[tokio::test]
async fn test_alternating_sequence_across_fleet() {
    let mut followers = spawn_followers(4).await;

    let registry = Arc::new(HostRegistry::with_defaults("leader"));
    registry.set_leader(Some("leader".to_string())).await;
    for node in &followers {
        registry.register(&node.name, &node.url).await.unwrap();
    }

    let client = FleetClient::new(ClientConfig::default()).unwrap();
    let engine = LeaderEngine::new(
        registry.clone(),
        PatternKind::Alternating.build(),
        Arc::new(client),
        Duration::from_secs(60),
    );

    let expected = [
        "host1", "host2", "host3", "host4", "host3", "host2", "host1", "host2",
    ];

    for want in expected {
        let outcome = engine.tick().await;
        assert!(matches!(outcome, TickOutcome::Dispatched(ref r) if r.failed == 0));
        assert_eq!(lit(&followers), vec![want.to_string()]);
    }

    for node in &mut followers {
        node.stop().await;
    }
}

#[tokio::test]
async fn test_linear_rotation_with_dead_follower() {
    let mut followers = spawn_followers(3).await;

    let registry = Arc::new(HostRegistry::with_defaults("leader"));
    registry.set_leader(Some("leader".to_string())).await;
    for node in &followers {
        registry.register(&node.name, &node.url).await.unwrap();
    }
    // Nothing listens on port 1
    registry.register("host4", "http://127.0.0.1:1").await.unwrap();

    let client =
        FleetClient::new(ClientConfig::default().with_timeout(Duration::from_millis(300))).unwrap();
    let engine = LeaderEngine::new(
        registry.clone(),
        PatternKind::Linear.build(),
        Arc::new(client),
        Duration::from_secs(60),
    );

    // Linear lights slot 1, 2, 3, 0: host2, host3, host4 (dead), host1
    engine.tick().await;
    assert_eq!(lit(&followers), vec!["host2".to_string()]);
    engine.tick().await;
    assert_eq!(lit(&followers), vec!["host3".to_string()]);
    engine.tick().await;
    assert!(lit(&followers).is_empty());
    engine.tick().await;
    assert_eq!(lit(&followers), vec!["host1".to_string()]);

    let dead = registry.get_host("host4").await.unwrap();
    assert_eq!(dead.failures, 1);
    for node in &followers {
        assert_eq!(registry.get_host(&node.name).await.unwrap().failures, 0);
    }

    for node in &mut followers {
        node.stop().await;
    }
}

// ============================================================================
// Self-organizing fleet
// ============================================================================

async fn fetch_stats(leader_url: &str) -> Vec<HostStats> {
    match http().get(format!("{leader_url}/leader/stats")).send().await {
        Ok(response) => response.json().await.unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_followers_join_and_dead_host_is_evicted() {
    let mut leader = TestNode::spawn("leader", LeaderSetup::Itself, PatternKind::Linear).await;
    let leader_url = leader.url.clone();

    let mut followers = Vec::new();
    for name in ["pi1", "pi2", "pi3"] {
        followers.push(
            TestNode::spawn(
                name,
                LeaderSetup::Remote {
                    name: "leader",
                    url: &leader_url,
                },
                PatternKind::Linear,
            )
            .await,
        );
    }

    // Leader plus three followers
    assert!(
        eventually(Duration::from_secs(5), || {
            let url = leader_url.clone();
            async move { fetch_stats(&url).await.len() == 4 }
        })
        .await,
        "fleet never converged"
    );

    let nodes = &followers;
    assert!(
        eventually(Duration::from_secs(5), || async move {
            nodes.iter().all(|f| f.state.registerer.is_registered())
        })
        .await
    );

    // Some follower gets lit as the pattern rotates
    assert!(
        eventually(Duration::from_secs(5), || async move {
            nodes.iter().any(|f| f.state.actuator.is_on())
        })
        .await
    );

    // Kill one follower; its failures climb until it is evicted
    let mut dead = followers.remove(0);
    dead.stop().await;

    let max_failures = leader.state.registry.max_failures();
    assert!(
        eventually(Duration::from_secs(10), || {
            let url = leader_url.clone();
            async move {
                fetch_stats(&url)
                    .await
                    .iter()
                    .any(|s| s.name == "pi1" && s.failures >= max_failures)
            }
        })
        .await,
        "dead follower was never evicted"
    );

    let active: Vec<String> = leader
        .state
        .registry
        .active_hosts()
        .await
        .into_iter()
        .map(|h| h.name)
        .collect();
    assert!(!active.contains(&"pi1".to_string()));
    assert!(active.contains(&"pi2".to_string()));

    for node in &mut followers {
        node.stop().await;
    }
    leader.stop().await;
}
