// ABOUTME: Router assembly and server lifecycle for the NutriPlan HTTP surface
// ABOUTME: Owns the injected provider state and the middleware stack
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Server Assembly
//!
//! Composes the assistant and health routers behind the shared middleware
//! stack and owns the server lifecycle. [`AppState`] carries the two
//! long-lived objects - the injected completion provider and the loaded
//! configuration; everything else is per-request.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::CompletionProvider;
use crate::routes::{AssistantRoutes, HealthRoutes};

/// Upper bound on request bodies; meal photos arrive base64-encoded inline
const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Shared state injected into request handlers
pub struct AppState {
    /// The completion-service client, constructed once at startup
    pub provider: Arc<dyn CompletionProvider>,
    /// Server configuration loaded from the environment
    pub config: ServerConfig,
}

impl AppState {
    /// Create the shared state from an injected provider and configuration
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, config: ServerConfig) -> Self {
        Self { provider, config }
    }
}

/// Build the full application router with the middleware stack
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(AssistantRoutes::routes(state))
        .merge(HealthRoutes::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Bind the configured address and serve until shutdown
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>) -> AppResult<()> {
    let address = format!("{}:{}", state.config.host, state.config.http_port);
    let router = build_router(Arc::clone(&state));

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {address}: {e}")))?;

    info!(%address, "HTTP server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}
