// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Demo node binary: connects to a hub, posts a greeting, then idles.

use clap::Parser;
use duplex_link::{Node, NodeConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Runs a demo duplex-link node.
#[derive(Parser, Debug)]
#[command(name = "duplex-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hub address, e.g. 127.0.0.1:9000
    #[arg(long)]
    hub: Option<String>,

    /// Peer name this node announces itself as
    #[arg(long, default_value = "client")]
    name: String,

    /// Configuration file (JSON), overrides the flags above when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = if let Some(path) = args.config {
        info!(?path, "loading node config from file");
        NodeConfig::from_file(&path)?
    } else {
        let hub = args
            .hub
            .ok_or("--hub is required unless --config is given")?;
        NodeConfig {
            name: args.name,
            hub_address: hub,
            connect_code: "c".to_string(),
            secret_key: "12345678".to_string(),
            heartbeat_secs: 5,
            get_timeout_ms: 1000,
            spill_dir: ".".to_string(),
        }
    };

    info!(hub = %config.hub_address, "connecting to hub");
    let node = Node::connect(config).await?;

    let node_for_run = node.clone();
    let runner = tokio::spawn(async move { node_for_run.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let id = node.post("echo", b"hello from node".to_vec()).await?;
    info!(id, "posted greeting");

    runner.await??;
    Ok(())
}
