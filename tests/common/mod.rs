//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use http_bridge::{BridgeConfig, RequestEvent, RequestEvents, WebServer};

/// A running bridge on an ephemeral loopback port.
pub struct TestBridge {
    pub server: Arc<WebServer>,
    pub events: RequestEvents,
    pub base_url: String,
}

impl TestBridge {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Next published request, failing the test if none shows up.
    pub async fn next_event(&mut self) -> RequestEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("no request event within 5s")
            .expect("event stream closed")
    }
}

pub fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.timeouts.response_secs = 10;
    config.timeouts.grace_period_ms = 200;
    config.timeouts.shutdown_timeout_ms = 2_000;
    config
}

pub async fn start_bridge(configure: impl FnOnce(&mut BridgeConfig)) -> TestBridge {
    let mut config = test_config();
    configure(&mut config);

    let (server, events) = WebServer::new(config);
    let addr = server.start(0).await.unwrap().addr();

    TestBridge {
        server: Arc::new(server),
        events,
        base_url: format!("http://{}", addr),
    }
}

/// Client without connection reuse so a stopped server is observed at once.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap()
}

/// Poll `condition` every 10ms until it holds, panicking after 5s.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not met within 5s");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
