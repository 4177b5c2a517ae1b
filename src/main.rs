// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use chat_relay::config::{self, ConfigSource};
use chat_relay::server;
use chat_relay::upstream;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chat-relay", about = "Streaming chat relay for hosted LLM completions")]
struct Cli {
    /// Path to the relay.yaml config file
    #[arg(long, default_value = "relay.yaml", env = "RELAY_CONFIG")]
    config: String,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = server::DEFAULT_PORT, env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::from((cli.host, cli.port));
    tracing::info!(%addr, "chat relay starting");

    let source = config::FileSource::new(cli.config);
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        environment = %config.environment,
        deployment = %config.upstream.deployment,
        model = %config.upstream.model,
        config_hash = %config.config_hash,
        origin = %source.origin(),
        "config loaded"
    );

    let completions: Arc<dyn upstream::CompletionSource> =
        Arc::new(upstream::build_completion_source(&config));
    let app = server::build_router(completions);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "chat relay listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
