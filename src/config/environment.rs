// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! Environment-based configuration management for production deployment

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::errors::{AppError, AppResult};

/// Default HTTP port when `NUTRIPLAN_HTTP_PORT` is not set
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default bound on a single completion-service call
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Environment type for logging and middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (default)
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Server configuration loaded once from the environment at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the unified HTTP server
    pub http_port: u16,
    /// Bind host for the HTTP server
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Upper bound on a single non-streaming completion-service call
    pub provider_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `NUTRIPLAN_HTTP_PORT` or
    /// `NUTRIPLAN_PROVIDER_TIMEOUT_SECS` is set but not parseable.
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var("NUTRIPLAN_HTTP_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| {
                AppError::config(format!("Invalid NUTRIPLAN_HTTP_PORT '{raw}': {e}"))
            })?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());

        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_owned()),
        );

        let provider_timeout_secs = match env::var("NUTRIPLAN_PROVIDER_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::config(format!(
                    "Invalid NUTRIPLAN_PROVIDER_TIMEOUT_SECS '{raw}': {e}"
                ))
            })?,
            Err(_) => DEFAULT_PROVIDER_TIMEOUT_SECS,
        };

        Ok(Self {
            http_port,
            host,
            environment,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
        })
    }

    /// One-line configuration summary for startup logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "environment={} host={} http_port={} provider_timeout={}s",
            self.environment,
            self.host,
            self.http_port,
            self.provider_timeout.as_secs()
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            host: "127.0.0.1".to_owned(),
            environment: Environment::Development,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }
}
