//! Failure scenario tests
//!
//! 1. Leader disappears: followers go unhealthy
//! 2. Leader changes: followers re-join the new one
//! 3. Evicted host re-registers and keeps its LED state
//! 4. Follower pointed at a non-leader never registers

use std::time::Duration;

use ledfleet::coordinator::{HostStats, RegisterRequest};
use ledfleet::scheduler::PatternKind;
use reqwest::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{eventually, http, LeaderSetup, TestNode};

async fn healthz(url: &str) -> Option<StatusCode> {
    http()
        .get(format!("{url}/healthz"))
        .send()
        .await
        .ok()
        .map(|r| r.status())
}

#[tokio::test]
async fn test_follower_unhealthy_after_leader_loss() {
    let mut leader = TestNode::spawn("leader", LeaderSetup::Itself, PatternKind::Linear).await;
    let leader_url = leader.url.clone();
    let mut follower = TestNode::spawn(
        "pi2",
        LeaderSetup::Remote {
            name: "leader",
            url: &leader_url,
        },
        PatternKind::Linear,
    )
    .await;

    let url = follower.url.clone();
    assert!(
        eventually(Duration::from_secs(5), || {
            let url = url.clone();
            async move { healthz(&url).await == Some(StatusCode::OK) }
        })
        .await
    );

    leader.stop().await;

    // Next heartbeat (1s) fails and the follower drops to fast retry
    assert!(
        eventually(Duration::from_secs(5), || {
            let url = url.clone();
            async move { healthz(&url).await == Some(StatusCode::SERVICE_UNAVAILABLE) }
        })
        .await,
        "follower stayed healthy without a leader"
    );

    follower.stop().await;
}

#[tokio::test]
async fn test_followers_rejoin_new_leader() {
    let mut old = TestNode::spawn("alpha", LeaderSetup::Itself, PatternKind::Linear).await;
    let old_url = old.url.clone();
    let mut new = TestNode::spawn(
        "beta",
        LeaderSetup::Remote {
            name: "alpha",
            url: &old_url,
        },
        PatternKind::Linear,
    )
    .await;
    let new_url = new.url.clone();

    // Both nodes learn that beta now leads
    for node in [&old, &new] {
        node.state
            .tracker
            .on_new_leader(Some("beta".to_string()), Some(new_url.clone()))
            .await;
    }

    assert!(
        eventually(Duration::from_secs(5), || {
            let url = new_url.clone();
            async move {
                let stats: Vec<HostStats> = match http()
                    .get(format!("{url}/leader/stats"))
                    .send()
                    .await
                {
                    Ok(r) if r.status() == StatusCode::OK => r.json().await.unwrap_or_default(),
                    _ => Vec::new(),
                };
                stats.iter().any(|s| s.name == "alpha") && stats.iter().any(|s| s.name == "beta")
            }
        })
        .await,
        "nodes never joined the new leader"
    );

    let response = http()
        .get(format!("{old_url}/leader/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    old.stop().await;
    new.stop().await;
}

#[tokio::test]
async fn test_rejoin_after_eviction_keeps_led_state() {
    let mut leader = TestNode::spawn("leader", LeaderSetup::Itself, PatternKind::Linear).await;
    let registry = leader.state.registry.clone();

    registry.register("pi9", "http://127.0.0.1:1").await.unwrap();
    registry.update_status("pi9", true, Some(true)).await.unwrap();
    for _ in 0..registry.max_failures() {
        registry.update_status("pi9", false, None).await.unwrap();
    }
    assert!(!registry.is_alive("pi9").await);

    let response = http()
        .post(format!("{}/leader/register", leader.url))
        .json(&RegisterRequest::new("http://127.0.0.1:1", Some("pi9".to_string())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "rejoined");

    let host = registry.get_host("pi9").await.unwrap();
    assert!(host.led_state);

    leader.stop().await;
}

#[tokio::test]
async fn test_registration_rejected_by_non_leader() {
    let not_leader = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/leader/register"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&not_leader)
        .await;

    let uri = not_leader.uri();
    let mut follower = TestNode::spawn(
        "pi2",
        LeaderSetup::Remote {
            name: "leader",
            url: &uri,
        },
        PatternKind::Linear,
    )
    .await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!follower.state.registerer.is_registered());
    assert_eq!(
        healthz(&follower.url).await,
        Some(StatusCode::SERVICE_UNAVAILABLE)
    );

    // Fast retry keeps knocking
    let requests = not_leader.received_requests().await.unwrap_or_default();
    assert!(requests.len() > 1);

    follower.stop().await;
}
