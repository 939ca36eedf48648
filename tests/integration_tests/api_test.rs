//! HTTP API tests against a single node
//!
//! 1. Leader-only routes answer 503 until the node leads
//! 2. Registration validation and stats ordering
//! 3. LED endpoints and health

use std::time::Duration;

use ledfleet::coordinator::HostStats;
use ledfleet::scheduler::PatternKind;
use reqwest::StatusCode;
use serde_json::json;

use super::fixtures::{eventually, http, LeaderSetup, TestNode};

// ============================================================================
// Leadership gating
// ============================================================================

#[tokio::test]
async fn test_leader_routes_unavailable_on_follower() {
    let mut node = TestNode::spawn("solo", LeaderSetup::None, PatternKind::Linear).await;
    let client = http();

    let response = client
        .post(format!("{}/leader/register", node.url))
        .json(&json!({"url": "http://127.0.0.1:1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client
        .get(format!("{}/leader/stats", node.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Nothing registered, so not healthy either
    let response = client.get(format!("{}/healthz", node.url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    node.stop().await;
}

#[tokio::test]
async fn test_put_leader_promotes_node() {
    let mut node = TestNode::spawn("solo", LeaderSetup::None, PatternKind::Linear).await;
    let client = http();

    let response = client
        .put(format!("{}/leader", node.url))
        .json(&json!({"name": "solo", "url": node.url}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let leader: serde_json::Value = client
        .get(format!("{}/leader", node.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leader["name"], "solo");
    assert_eq!(leader["leading"], true);

    // The registerer registers in-process and flips health
    let url = node.url.clone();
    assert!(
        eventually(Duration::from_secs(2), || {
            let client = client.clone();
            let url = url.clone();
            async move {
                client
                    .get(format!("{url}/healthz"))
                    .send()
                    .await
                    .is_ok_and(|r| r.status() == StatusCode::OK)
            }
        })
        .await
    );

    node.stop().await;
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_registration_and_stats() {
    let mut node = TestNode::spawn("leader", LeaderSetup::Itself, PatternKind::Linear).await;
    let client = http();

    for (name, url) in [("zeta", "http://127.0.0.1:1"), ("alpha", "http://127.0.0.1:2")] {
        let response = client
            .post(format!("{}/leader/register", node.url))
            .json(&json!({"url": url, "name": name}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Name derived from the URL when absent
    let response = client
        .post(format!("{}/leader/register", node.url))
        .json(&json!({"url": "http://127.0.0.1:3"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let stats: Vec<HostStats> = client
        .get(format!("{}/leader/stats", node.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"alpha"));
    assert!(names.contains(&"zeta"));
    assert!(names.contains(&"127.0.0.1:3"));

    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    node.stop().await;
}

#[tokio::test]
async fn test_malformed_registration_rejected() {
    let mut node = TestNode::spawn("leader", LeaderSetup::Itself, PatternKind::Linear).await;
    let client = http();

    let response = client
        .post(format!("{}/leader/register", node.url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/leader/register", node.url))
        .json(&json!({"url": "ftp://example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/leader/register", node.url))
        .json(&json!({"name": "nourl"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(node.state.registry.get_host("nourl").await.is_none());

    node.stop().await;
}

// ============================================================================
// LED endpoints
// ============================================================================

#[tokio::test]
async fn test_led_endpoints() {
    let mut node = TestNode::spawn("follower", LeaderSetup::None, PatternKind::Linear).await;
    let client = http();
    let led_url = format!("{}/endpoint/led", node.url);

    let response = client.post(&led_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let led: serde_json::Value = client.get(&led_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(led["on"], true);

    let response = client.delete(&led_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!node.state.actuator.is_on());

    node.stop().await;
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let _ = ledfleet::metrics::init_metrics();
    let mut node = TestNode::spawn("leader", LeaderSetup::Itself, PatternKind::Linear).await;

    let response = http()
        .get(format!("{}/metrics", node.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("ledfleet_"));

    node.stop().await;
}
