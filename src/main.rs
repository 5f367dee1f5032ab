//! Media metadata and download proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────┐
//!                        │                   MEDIA PROXY                     │
//!                        │                                                   │
//!   Client Request       │  ┌────────┐    ┌─────────┐    ┌──────────────┐    │
//!   ─────────────────────┼─▶│  http  │───▶│ routing │───▶│  resources   │    │
//!                        │  │ server │    │  table  │    │  Operation   │    │
//!                        │  └────────┘    └─────────┘    └──────┬───────┘    │
//!                        │                                      │            │
//!                        │                                      ▼            │
//!                        │                              ┌──────────────┐     │
//!                        │                              │   upstream   │     │
//!                        │                              │ client+cache │─────┼──▶ AniList / extractors
//!                        │                              └──────┬───────┘     │
//!                        │                                      │            │
//!   Client Response      │  ┌──────────┐                        ▼            │
//!   ◀────────────────────┼──│ response │◀──────────── normalized JSON        │
//!                        │  │ envelope │                                     │
//!                        │  └──────────┘                                     │
//!                        │                                                   │
//!                        │  Cross-cutting: config · observability · lifecycle│
//!                        └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use media_proxy::config::{load_config, ProxyConfig};
use media_proxy::lifecycle::startup;
use media_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "media-proxy")]
#[command(about = "JSON proxy for anime metadata and media extraction APIs", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);

    tracing::info!("media-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.listener.base_path,
        cache_enabled = config.cache.enabled,
        cache_ttl_secs = config.cache.ttl_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
