//! relay: serve mounted upstreams, or fetch a single resource.
//!
//! ```text
//!   inbound HTTP ──▶ http::server ──▶ mount table ──▶ pipeline ──▶ Fetch step
//!                                                                  │
//!                            file: / loop: / http: / https: ◀──── client
//! ```

use clap::{Parser, Subcommand};
use relay::client::{Client, RequestDescriptor};
use relay::config::{load_config, RelayConfig};
use relay::http::HttpServer;
use relay::mount::{MountTable, Mounts};
use relay::observability::{logging, metrics};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Pipeline server and protocol-routing client", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the configured mounts over HTTP
    Serve,
    /// Fetch one resource and print it
    Fetch {
        /// Target, e.g. file:///etc/hosts or https://example.com/
        href: String,

        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra header, "name: value"
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body (text, encoded with the configured charset)
        #[arg(short, long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("relay v{} starting", env!("CARGO_PKG_VERSION"));

    let client = Client::new(&config)?;
    let mounts: Arc<dyn MountTable> = Arc::new(Mounts::from_config(
        &config.mounts,
        config.pipeline.clone(),
        &client,
    ));
    client.attach(mounts.clone());

    match cli.command {
        Commands::Serve => serve(config, mounts).await,
        Commands::Fetch {
            href,
            method,
            headers,
            data,
        } => fetch(&client, href, method, headers, data).await,
    }
}

async fn serve(config: RelayConfig, mounts: Arc<dyn MountTable>) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mounts = config.mounts.len(),
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, mounts)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn fetch(
    client: &Client,
    href: String,
    method: String,
    headers: Vec<String>,
    data: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut descriptor = RequestDescriptor::new(href).method(method.parse()?);
    for header in &headers {
        let Some((name, value)) = header.split_once(':') else {
            return Err(format!("malformed header `{header}`, expected `name: value`").into());
        };
        descriptor.headers.append(
            axum::http::HeaderName::try_from(name.trim())?,
            axum::http::HeaderValue::from_str(value.trim())?,
        );
    }
    if let Some(data) = data {
        descriptor = descriptor.text(data);
    }

    let envelope = client.request(descriptor).await;

    let headers: serde_json::Map<String, serde_json::Value> = envelope
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                serde_json::Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
            )
        })
        .collect();
    let summary = serde_json::json!({
        "status": envelope.status().as_u16(),
        "headers": headers,
    });
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);

    std::io::stdout().write_all(envelope.body())?;
    Ok(())
}
