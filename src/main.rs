//! http-bridge
//!
//! Embedded HTTP server whose responses come from an external handler.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────┐    ┌──────────┐   RequestEvent   ┌──────────────────┐
//!     ───────────────────▶│ listener │───▶│  bridge  │─────────────────▶│ external handler │
//!                         │  (axum)  │    │ handler  │                  │  (echo / stdout  │
//!                         └──────────┘    └────┬─────┘                  │   + control API) │
//!                                              │ wait ≤ timeout         └────────┬─────────┘
//!                                              ▼                                 │ respond(id, ...)
//!     Client Response     ┌──────────┐    ┌──────────┐                  ┌────────▼─────────┐
//!     ◀───────────────────│ response │◀───│  store   │◀─────────────────│  completion sink │
//!                         └──────────┘    └──────────┘                  └──────────────────┘
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use http_bridge::bridge::RequestEvents;
use http_bridge::config::{load_config, BridgeConfig};
use http_bridge::control;
use http_bridge::dispatch::{serve_requests, Request, WebResponse};
use http_bridge::lifecycle::{wait_for_signal, Shutdown, WebServer};
use http_bridge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "http-bridge", version)]
#[command(about = "Embedded HTTP server that hands every request to an external handler", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server and answer requests until interrupted
    Serve {
        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// Who answers incoming requests
        #[arg(short, long, value_enum, default_value_t = Mode::Echo)]
        mode: Mode,
    },
    /// Print the best-guess LAN address of this device
    DeviceIp,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Answer every request with a JSON echo of it
    Echo,
    /// Print each request event as a JSON line; answer through the control API
    Stdout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Commands::DeviceIp => {
            println!("{}", http_bridge::net::device_ip());
            Ok(())
        }
        Commands::Serve { port, mode } => serve(config, port, mode).await,
    }
}

async fn serve(config: BridgeConfig, port: Option<u16>, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);
    tracing::info!("http-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let port = port.unwrap_or(config.listener.port);
    let (server, events) = WebServer::new(config.clone());
    let server = Arc::new(server);

    match mode {
        Mode::Echo => {
            tokio::spawn(serve_requests(events, server.completion_sink(), echo));
        }
        Mode::Stdout => {
            if !config.control.enabled {
                tracing::warn!("stdout mode without the control API: requests can only time out");
            }
            tokio::spawn(print_events(events));
        }
    }

    let outcome = server.start(port).await?;
    tracing::info!(
        address = %outcome.addr(),
        device_ip = %server.device_ip(),
        mode = ?mode,
        "Ready"
    );

    let control_shutdown = Shutdown::new();
    let control_task = if config.control.enabled {
        let listener = TcpListener::bind(&config.control.bind_address).await?;
        Some(tokio::spawn(control::serve_control(
            Arc::clone(&server),
            listener,
            control_shutdown.subscribe(),
        )))
    } else {
        None
    };

    wait_for_signal().await;

    server.stop().await?;
    control_shutdown.trigger();
    if let Some(task) = control_task {
        if let Ok(Err(e)) = task.await {
            tracing::error!(error = %e, "Control API exited with error");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn echo(request: Request) -> Result<WebResponse, Infallible> {
    let body = json!({
        "message": "Hello from http-bridge!",
        "request": {
            "method": request.method,
            "path": request.path,
            "headers": request.headers,
            "params": request.params,
            "body": request.body,
        },
    });

    Ok(WebResponse {
        headers: Some(BTreeMap::from([
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
            (
                "Access-Control-Allow-Methods".to_string(),
                "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            ),
            ("Access-Control-Allow-Headers".to_string(), "Content-Type".to_string()),
        ])),
        ..WebResponse::json(body.to_string())
    })
}

async fn print_events(mut events: RequestEvents) {
    while let Some(event) = events.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(request_id = %event.request_id, error = %e, "Failed to encode event"),
        }
    }
}
