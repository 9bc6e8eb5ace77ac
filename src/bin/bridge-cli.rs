use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;

use http_bridge::control::RespondCommand;
use http_bridge::{RequestId, ResponseData};

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Control CLI for a running http-bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:3001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the server runs and how many requests are pending
    Status,
    /// Deliver the response for a pending request
    Respond {
        /// Request id from the published event
        request_id: String,

        #[arg(short, long, default_value_t = 200)]
        status: u16,

        #[arg(short = 'd', long, default_value = "OK")]
        description: String,

        #[arg(short = 't', long)]
        content_type: Option<String>,

        /// Response header as NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(short, long)]
        body: Option<String>,

        /// Local file to send instead of the body
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Stop the server
    Stop,
    /// Print the device IP reported by the server
    DeviceIp,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/control/status", cli.url)).send().await?,
        Commands::Respond {
            request_id,
            status,
            description,
            content_type,
            headers,
            body,
            file,
        } => {
            let command = RespondCommand {
                request_id: RequestId::from(request_id),
                response: ResponseData {
                    status_code: status,
                    status_description: description,
                    content_type,
                    headers: parse_headers(&headers)?,
                    body,
                    file,
                },
            };
            client
                .post(format!("{}/control/respond", cli.url))
                .json(&command)
                .send()
                .await?
        }
        Commands::Stop => client.post(format!("{}/control/stop", cli.url)).send().await?,
        Commands::DeviceIp => client.get(format!("{}/control/device-ip", cli.url)).send().await?,
    };

    print_response(res).await
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    raw.iter()
        .map(|h| {
            h.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| format!("header {h:?} is not NAME:VALUE"))
        })
        .collect()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
