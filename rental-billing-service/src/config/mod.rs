//! Configuration module for rental-billing-service.

use rental_core::config::ServerConfig;
use rental_core::error::AppError;
use std::env;

use crate::billing::RateResolution;

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub common: ServerConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub billing: BillingRules,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Knobs of the billing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingRules {
    pub rate_resolution: RateResolution,
    /// Rooms generated at once by batch runs (1 = sequential).
    pub batch_concurrency: usize,
    /// Day of the following month a bill falls due.
    pub due_day: u32,
}

impl Default for BillingRules {
    fn default() -> Self {
        Self {
            rate_resolution: RateResolution::BilledMonth,
            batch_concurrency: 1,
            due_day: 5,
        }
    }
}

impl BillingRules {
    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rate_resolution = match lookup("BILLING_RATE_RESOLUTION") {
            Some(value) => value.parse()?,
            None => defaults.rate_resolution,
        };

        Ok(Self {
            rate_resolution,
            batch_concurrency: lookup("BILLING_BATCH_CONCURRENCY")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.batch_concurrency)
                .clamp(1, 32),
            due_day: lookup("BILLING_DUE_DAY")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(defaults.due_day)
                .clamp(1, 28),
        })
    }
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = ServerConfig::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "rental-billing-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            billing: BillingRules::from_lookup(|key| env::var(key).ok())?,
        })
    }
}
