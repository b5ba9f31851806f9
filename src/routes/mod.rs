// ABOUTME: Route module organization for NutriPlan HTTP endpoints
// ABOUTME: Route definitions organized by domain with thin handler functions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! Route module for the NutriPlan server
//!
//! Each domain module contains only route definitions and thin handler
//! functions that delegate to the action catalog, normalization pipeline,
//! and injected completion provider.

/// The assistant action endpoint and streaming chat relay
pub mod assistant;

/// Health check and system status routes
pub mod health;

/// Assistant route handlers
pub use assistant::AssistantRoutes;
/// Health check route handlers
pub use health::HealthRoutes;
