//! Server lifecycle handle.
//!
//! # Responsibilities
//! - Idempotent start: a second `start` while running is a logged no-op
//! - Own the correlation store of each run and attach it to the sink
//! - Bounded stop: stop accepting, give pending exchanges a grace period,
//!   drain whatever is left, then wait for the server task with a hard cutoff
//!
//! # Design Decisions
//! - Explicit handle instead of a global instance; start/stop serialize on
//!   a transition mutex so a stop always finishes before the next start binds
//! - The running slot is only locked briefly, so status queries never wait
//!   out a stop's grace period
//! - A fresh store per run: a response for a previous run can never reach
//!   the next one

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::bridge::{self, BridgeHandler, CompletionSink, CorrelationStore, EventPublisher, RequestEvents, RequestId, ResponseData};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::net;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(SocketAddr),
    /// A server was already running; nothing changed.
    AlreadyRunning(SocketAddr),
}

impl StartOutcome {
    pub fn addr(&self) -> SocketAddr {
        match self {
            StartOutcome::Started(addr) | StartOutcome::AlreadyRunning(addr) => *addr,
        }
    }
}

struct Running {
    addr: SocketAddr,
    store: Arc<CorrelationStore>,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
}

/// The embedded web server.
pub struct WebServer {
    config: BridgeConfig,
    publisher: EventPublisher,
    sink: CompletionSink,
    transition: Mutex<()>,
    running: Mutex<Option<Running>>,
}

impl WebServer {
    /// Create a stopped server and the stream its requests are published on.
    pub fn new(config: BridgeConfig) -> (Self, RequestEvents) {
        let (publisher, events) = bridge::events::channel();
        let server = Self {
            config,
            publisher,
            sink: CompletionSink::new(),
            transition: Mutex::new(()),
            running: Mutex::new(None),
        };
        (server, events)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Start listening on `port` (0 picks an ephemeral port).
    pub async fn start(&self, port: u16) -> BridgeResult<StartOutcome> {
        let _transition = self.transition.lock().await;

        let stale = {
            let mut running = self.running.lock().await;
            if let Some(current) = running.as_ref() {
                if !current.task.is_finished() {
                    tracing::info!(address = %current.addr, "Server is already running");
                    return Ok(StartOutcome::AlreadyRunning(current.addr));
                }
            }
            running.take()
        };
        if let Some(stale) = stale {
            tracing::warn!(address = %stale.addr, "Previous server exited on its own, cleaning up");
            self.sink.detach();
            stale.store.drain_all();
        }

        let host: IpAddr = self.config.listener.host.parse().map_err(|_| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid listener host {:?}", self.config.listener.host),
            ))
        })?;
        let listener = net::bind(host, port).await?;
        let addr = listener.local_addr()?;

        let store = Arc::new(CorrelationStore::new());
        let state = AppState {
            bridge: BridgeHandler::new(Arc::clone(&store), self.publisher.clone(), self.config.timeouts.response()),
            max_body_bytes: self.config.listener.max_body_bytes,
        };
        let shutdown = Shutdown::new();
        let task = tokio::spawn(HttpServer::new(state).run(listener, shutdown.subscribe()));

        self.sink.attach(Arc::clone(&store));
        *self.running.lock().await = Some(Running {
            addr,
            store,
            shutdown,
            task,
        });

        tracing::info!(address = %addr, "Web server started");
        Ok(StartOutcome::Started(addr))
    }

    /// Stop the server. Returns `false` if it was not running.
    ///
    /// Every exchange still pending once the grace period ends is completed
    /// with a "server stopped" response, so no caller waits past the stop.
    pub async fn stop(&self) -> BridgeResult<bool> {
        let _transition = self.transition.lock().await;
        let Some(mut current) = self.running.lock().await.take() else {
            tracing::debug!("Stop requested but server is not running");
            return Ok(false);
        };

        tracing::info!(address = %current.addr, pending = current.store.len(), "Stopping web server");
        current.shutdown.trigger();

        let grace = self.config.timeouts.grace_period();
        let store = Arc::clone(&current.store);
        let settled = tokio::time::timeout(grace, async move {
            while !store.is_empty() {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok();
        if !settled {
            tracing::info!(
                pending = current.store.len(),
                grace_ms = grace.as_millis() as u64,
                "Grace period over, cancelling pending exchanges"
            );
        }

        self.sink.detach();
        let cancelled = current.store.drain_all();
        if cancelled > 0 {
            tracing::info!(cancelled, "Pending exchanges cancelled");
        }

        let cutoff = self.config.timeouts.shutdown_timeout();
        let result = match tokio::time::timeout(cutoff, &mut current.task).await {
            Ok(Ok(result)) => result.map_err(BridgeError::Io),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Server task failed");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(timeout_ms = cutoff.as_millis() as u64, "Server did not stop in time, aborting");
                current.task.abort();
                Ok(())
            }
        };

        tracing::info!(address = %current.addr, "Web server stopped");
        result.map(|()| true)
    }

    /// Deliver a response for `request_id`. See [`CompletionSink::respond`].
    pub fn respond(&self, request_id: &RequestId, response: ResponseData) -> bool {
        self.sink.respond(request_id, response)
    }

    /// Cloneable handle for delivering responses from other tasks or threads.
    pub fn completion_sink(&self) -> CompletionSink {
        self.sink.clone()
    }

    pub fn device_ip(&self) -> std::net::Ipv4Addr {
        net::device_ip()
    }

    /// Number of exchanges waiting for a response.
    pub fn pending(&self) -> usize {
        self.sink.pending()
    }

    /// Address of the running listener, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|current| current.addr)
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|current| !current.task.is_finished())
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        if let Some(current) = self.running.get_mut().take() {
            self.sink.detach();
            current.store.drain_all();
            current.shutdown.trigger();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.listener.host = "127.0.0.1".into();
        config.timeouts.grace_period_ms = 100;
        config.timeouts.shutdown_timeout_ms = 2_000;
        config
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let (server, _events) = WebServer::new(config());

        let first = server.start(0).await.unwrap();
        assert!(matches!(first, StartOutcome::Started(_)));

        let second = server.start(0).await.unwrap();
        assert_eq!(second, StartOutcome::AlreadyRunning(first.addr()));

        assert!(server.stop().await.unwrap());
    }

    #[tokio::test]
    async fn stop_when_stopped_is_a_no_op() {
        let (server, _events) = WebServer::new(config());
        assert!(!server.stop().await.unwrap());
    }

    #[tokio::test]
    async fn occupied_port_leaves_server_stopped() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let (server, _events) = WebServer::new(config());
        let err = server.start(port).await.unwrap_err();
        assert!(matches!(err, BridgeError::PortUnavailable { port: p, .. } if p == port));
        assert!(!server.is_running().await);
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let (server, _events) = WebServer::new(config());
        let addr = server.start(0).await.unwrap().addr();
        assert_eq!(server.local_addr().await, Some(addr));
        assert!(server.stop().await.unwrap());
        assert!(!server.is_running().await);

        assert!(matches!(server.start(0).await.unwrap(), StartOutcome::Started(_)));
        assert!(server.stop().await.unwrap());
    }

    #[tokio::test]
    async fn status_queries_do_not_wait_for_stop() {
        let mut config = config();
        config.timeouts.grace_period_ms = 1_500;
        let (server, _events) = WebServer::new(config);
        let server = Arc::new(server);
        let addr = server.start(0).await.unwrap().addr();

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /held HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while server.pending() == 0 {
            assert!(tokio::time::Instant::now() < deadline, "request never registered");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let stopping = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.stop().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let running = tokio::time::timeout(Duration::from_millis(200), server.is_running()).await;
        assert_eq!(running.ok(), Some(false));
        let addr = tokio::time::timeout(Duration::from_millis(200), server.local_addr()).await;
        assert_eq!(addr.ok(), Some(None));
        assert!(!stopping.is_finished());

        assert!(stopping.await.unwrap().unwrap());
        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 503"), "unexpected reply: {}", reply);
    }

    #[tokio::test]
    async fn start_waits_for_stop_in_progress() {
        let mut config = config();
        config.timeouts.grace_period_ms = 300;
        let (server, _events) = WebServer::new(config);
        let server = Arc::new(server);
        let addr = server.start(0).await.unwrap().addr();

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /held HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        while server.pending() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let stopping = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.stop().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(server.start(0).await.unwrap(), StartOutcome::Started(_)));
        assert!(stopping.is_finished());
        assert!(stopping.await.unwrap().unwrap());
        assert!(server.stop().await.unwrap());
    }

    #[tokio::test]
    async fn respond_after_stop_is_ignored() {
        let (server, _events) = WebServer::new(config());
        server.start(0).await.unwrap();
        server.stop().await.unwrap();
        assert!(!server.respond(&RequestId::from("late"), ResponseData::default()));
    }
}
