// ABOUTME: Server binary for the NutriPlan assistant API
// ABOUTME: Loads configuration, constructs the Gemini client once, and serves the router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # NutriPlan Server Binary
//!
//! Starts the assistant HTTP server. The completion-service credential is
//! checked once here, at startup: a missing `GEMINI_API_KEY` fails the
//! process before any request is accepted.

use anyhow::Result;
use clap::Parser;
use nutriplan_server::{
    config::ServerConfig,
    llm::{CompletionProvider, GeminiClient},
    logging,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nutriplan-server")]
#[command(about = "NutriPlan API - AI-backed diet planning and nutrition assistant")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration from environment
    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    // Initialize production logging
    logging::init_from_env()?;

    info!("Starting NutriPlan assistant server");
    info!("{}", config.summary());

    // Construct the completion-service client once; a missing credential is
    // a startup-fatal condition, not a request-time surprise.
    let provider = GeminiClient::from_env()?;
    info!(
        "Completion provider ready: {} (model: {})",
        provider.display_name(),
        provider.default_model()
    );

    let state = Arc::new(AppState::new(Arc::new(provider), config.clone()));

    display_available_endpoints(&config);
    info!("Ready to serve assistant requests");

    if let Err(e) = server::serve(state).await {
        error!("Server error: {e}");
        return Err(e.into());
    }

    Ok(())
}

/// Display the available API endpoints at startup
fn display_available_endpoints(config: &ServerConfig) {
    let host = &config.host;
    let port = config.http_port;

    info!("=== Available API Endpoints ===");
    info!("Assistant:");
    info!("   Action Endpoint:   POST http://{host}:{port}/api/assistant");
    info!("   Chat Streaming:    POST http://{host}:{port}/api/assistant (action=sendMessageToAI)");
    info!("Monitoring:");
    info!("   Health Check:      GET  http://{host}:{port}/health");
    info!("   Readiness Check:   GET  http://{host}:{port}/ready");
    info!("=== End of Endpoint List ===");
}
