//! Shared helpers for spawning nodes

use std::future::Future;
use std::time::Duration;

use ledfleet::config::NodeConfig;
use ledfleet::coordinator::{AppState, NodeServer, ServerError};
use ledfleet::scheduler::PatternKind;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How a test node learns its leader
pub enum LeaderSetup<'a> {
    /// No leader configured
    None,
    /// This node leads
    Itself,
    /// Another node leads
    Remote { name: &'a str, url: &'a str },
}

/// A node serving on an ephemeral port
pub struct TestNode {
    pub name: String,
    pub url: String,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestNode {
    pub async fn spawn(name: &str, leader: LeaderSetup<'_>, pattern: PatternKind) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        let mut builder = NodeConfig::builder()
            .node_name(name)
            .bind_address(addr)
            .advertise_url(url.clone())
            .pattern(pattern)
            .tick_interval_ms(50)
            .heartbeat_interval_secs(1)
            .retry_interval_ms(20)
            .request_timeout_ms(300)
            .enable_request_logging(false);

        builder = match leader {
            LeaderSetup::None => builder,
            LeaderSetup::Itself => builder.leader(name, None),
            LeaderSetup::Remote { name, url } => builder.leader(name, Some(url.to_string())),
        };

        let server = NodeServer::new(builder.build().unwrap()).unwrap();
        let state = server.state();

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Self {
            name: name.to_string(),
            url,
            state,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    /// Stop serving and wait for background loops to exit
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}

/// HTTP client for test assertions
pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
