//! HTTP client for node-to-node calls
//!
//! One client covers every outbound request in the fleet:
//! - leader → follower LED dispatch (`POST`/`DELETE /endpoint/led`)
//! - follower → leader registration (`POST /leader/register`)
//! - operator → leader stats (`GET /leader/stats`)
//!
//! Calls are never retried here. A failed dispatch is retried by the next
//! tick, a failed registration by the registerer's fast retry.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::engine::Dispatcher;
use super::registry::{Host, HostStats, RegisterRequest};

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the fleet client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout
    pub timeout: Duration,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            user_agent: format!("ledfleet/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Fleet Client
// ============================================================================

/// Client for talking to other fleet nodes
#[derive(Debug, Clone)]
pub struct FleetClient {
    http_client: Client,
}

impl FleetClient {
    /// Create a new fleet client
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Switch a follower's LED.
    ///
    /// `POST` (turn on) must answer 201, `DELETE` (turn off) must answer 204.
    pub async fn set_led(&self, base_url: &str, on: bool) -> Result<(), ClientError> {
        let url = endpoint(base_url, "/endpoint/led");

        let (request, expected) = if on {
            (self.http_client.post(&url), StatusCode::CREATED)
        } else {
            (self.http_client.delete(&url), StatusCode::NO_CONTENT)
        };

        let response = request.send().await?;
        expect_status(response.status(), expected)
    }

    /// Register (or heartbeat) with the leader at `leader_url`
    pub async fn register(
        &self,
        leader_url: &str,
        request: &RegisterRequest,
    ) -> Result<(), ClientError> {
        let url = endpoint(leader_url, "/leader/register");

        let response = self.http_client.post(&url).json(request).send().await?;

        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::SERVICE_UNAVAILABLE => Err(ClientError::NotLeader),
            status => Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                expected: StatusCode::CREATED.as_u16(),
            }),
        }
    }

    /// Fetch the leader's per-host stats
    pub async fn stats(&self, leader_url: &str) -> Result<Vec<HostStats>, ClientError> {
        let url = endpoint(leader_url, "/leader/stats");

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => response
                .json::<Vec<HostStats>>()
                .await
                .map_err(|e| ClientError::Parse(e.to_string())),
            StatusCode::SERVICE_UNAVAILABLE => Err(ClientError::NotLeader),
            status => Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                expected: StatusCode::OK.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl Dispatcher for FleetClient {
    async fn dispatch(&self, host: &Host, on: bool) -> Result<(), ClientError> {
        self.set_led(&host.url, on).await
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn expect_status(status: StatusCode, expected: StatusCode) -> Result<(), ClientError> {
    if status == expected {
        Ok(())
    } else {
        Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            expected: expected.as_u16(),
        })
    }
}

// ============================================================================
// Client Errors
// ============================================================================

/// Client errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),

    /// Connection refused, timeout, or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Peer answered with the wrong status code
    #[error("Unexpected HTTP status {status} (expected {expected})")]
    UnexpectedStatus { status: u16, expected: u16 },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Peer is not the leader
    #[error("Peer is not the current leader")]
    NotLeader,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl ClientError {
    /// Whether a later attempt could succeed without operator action
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Init(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
