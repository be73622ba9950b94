// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Demo hub binary: accepts nodes and echoes posts it receives.

use clap::Parser;
use duplex_link::{Hub, HubConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Runs a demo duplex-link hub.
#[derive(Parser, Debug)]
#[command(name = "duplex-hub")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// UDP port to listen on
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Peer name this hub announces itself as
    #[arg(long, default_value = "servers")]
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
        info!(?path, "loading hub config from file");
        HubConfig::from_file(&path)?
    } else {
        HubConfig {
            name: args.name,
            bind_address: args.bind.parse()?,
            port: args.port,
            ..Default::default()
        }
    };

    info!(bind = %config.bind_address, port = config.port, "starting hub");
    let hub = Hub::bind(config).await?;

    hub.handlers.register_request(
        "echo",
        |_ctx: &duplex_link::HubCtx, payload: &[u8]| payload.to_vec(),
    );
    hub.handlers.register_notice(
        "ping",
        |_ctx: &duplex_link::HubCtx, payload: &[u8]| {
            info!(bytes = payload.len(), "received notice");
        },
    );

    hub.run().await?;
    info!("hub stopped");
    Ok(())
}
