// ABOUTME: Configuration module organization for the NutriPlan server
// ABOUTME: Environment-only configuration, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! Configuration management
//!
//! All configuration is read from the process environment once at startup.

/// Environment-based server configuration
pub mod environment;

pub use environment::{Environment, ServerConfig};
