// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Culler Classification Server
//!
//! Accepts image uploads and answers with a category from the vision model.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use culler::config::AppConfig;
use culler::oracle::{CategoryOracle, OllamaOracle};
use culler::Result;

#[derive(Parser, Debug)]
#[command(name = "culler-server")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Culler image classification server")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep uploaded files instead of removing them after classification
    #[arg(long)]
    keep_uploads: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Culler classification server v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.keep_uploads {
        config.server.keep_uploads = true;
    }

    // The server always talks to the model directly; uploading to itself would loop
    let oracle = OllamaOracle::from_config(&config)?;
    if let Err(e) = oracle.client().health_check().await {
        tracing::warn!("{}. Every upload will be Uncategorized until Ollama is up.", e);
    }
    info!("Vision model: {} at {}", oracle.model(), oracle.client().base_url());

    let oracle: Arc<dyn CategoryOracle> = Arc::new(oracle);
    culler::web::start_server(config, oracle).await
}
