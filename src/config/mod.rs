//! Configuration management for the authorization core

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment ("development", "staging", "production", ...)
    pub environment: String,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
    /// Policy evaluation behaviour
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "text" or "json"
    pub log_format: String,
    pub service_name: String,
    /// Install the Prometheus recorder and dump a snapshot after each command
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            service_name: "menagerie-authz".to_string(),
            metrics_enabled: false,
        }
    }
}

/// Policy evaluation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// When true, a misconfigured operation surfaces as `AppError::Misconfigured`
    /// instead of a plain denial.
    pub strict_misconfiguration: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strict_misconfiguration: true,
        }
    }
}

impl PolicyConfig {
    /// Deny quietly on misconfiguration. Used in production.
    pub fn lenient() -> Self {
        Self {
            strict_misconfiguration: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DATABASE_MAX_CONNECTIONS")?,
                acquire_timeout_secs: env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
                service_name: env::var("OTEL_SERVICE_NAME")
                    .unwrap_or_else(|_| "menagerie-authz".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
            },
            policy: PolicyConfig {
                strict_misconfiguration: env::var("AUTHZ_STRICT_MISCONFIGURATION")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(!is_production(&environment)),
            },
            environment,
        })
    }
}

fn is_production(environment: &str) -> bool {
    environment.eq_ignore_ascii_case("production")
}
