// ABOUTME: Main library entry point for the NutriPlan assistant server
// ABOUTME: Provides the AI action router, streaming chat relay, and typed client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

#![deny(unsafe_code)]

//! # NutriPlan Server
//!
//! An HTTP backend for a diet-planning and nutrition-tracking application.
//! The server exposes a single action endpoint that maps `{action, payload}`
//! envelopes to prompts for a generative-AI completion service (Google
//! Gemini), normalizes the responses, and relays them to the client - plus a
//! streaming chat relay that forwards incremental text fragments as
//! newline-delimited JSON.
//!
//! ## Features
//!
//! - **Action router**: one typed catalog entry per assistant action, from
//!   daily/weekly meal planning to meal-photo analysis
//! - **Streaming chat**: one-directional relay of AI text fragments with
//!   incremental client-side decoding
//! - **Injected provider**: the completion service client is constructed once
//!   at startup and injected, never a module-level singleton
//! - **Typed client**: a `reqwest`-based counterpart mirroring the action
//!   catalog for consumers of the HTTP surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nutriplan_server::config::ServerConfig;
//! use nutriplan_server::errors::AppResult;
//! use nutriplan_server::llm::GeminiClient;
//! use nutriplan_server::server::AppState;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let provider = Arc::new(GeminiClient::from_env()?);
//!     let state = Arc::new(AppState::new(provider, config));
//!     let router = nutriplan_server::server::build_router(state);
//!     println!("router ready: {router:?}");
//!     Ok(())
//! }
//! ```

/// Action catalog: typed payloads, prompt construction, and response modes
pub mod actions;

/// Typed HTTP client for the assistant endpoint, including the chat stream reader
pub mod client;

/// Configuration management from environment variables
pub mod config;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// Data-URL decoding for photographed-meal submissions
pub mod image;

/// LLM provider abstraction and the Gemini implementation
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// Common data models for plans, meals, and user profiles
pub mod models;

/// Response normalization: fence stripping, JSON parsing, weekly folding
pub mod normalize;

/// HTTP routes for the assistant endpoint and health probes
pub mod routes;

/// Router assembly and server lifecycle
pub mod server;
