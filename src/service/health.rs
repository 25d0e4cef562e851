//! Rolling error-rate health check over the query log.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::config::HealthConfig;
use crate::db::Database;
use crate::error::ServiceError;

/// Aggregation window used when the caller does not supply one.
pub const DEFAULT_WINDOW_MINUTES: u32 = 5;

/// Health status derived from the rolling average error rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "SERVER DOWN")]
    ServerDown,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::ServerDown => write!(f, "SERVER DOWN"),
        }
    }
}

/// Aggregated health report for one trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub average_error_rate: f64,
    pub time_frame: String,
    pub version: String,
}

/// Computes health reports from the persisted query log.
pub struct HealthMonitor {
    db: Arc<dyn Database>,
    settings: HealthConfig,
}

impl HealthMonitor {
    pub fn new(db: Arc<dyn Database>, settings: HealthConfig) -> Self {
        Self { db, settings }
    }

    /// Average the error rate of all queries recorded in the trailing
    /// `window_minutes` window and compare it against the configured
    /// threshold. An empty window reads as a zero error rate.
    pub async fn check(&self, window_minutes: u32) -> Result<HealthReport, ServiceError> {
        let cutoff = Utc::now() - chrono::Duration::minutes(i64::from(window_minutes));
        let rates = self.db.error_rates_since(cutoff).await?;

        let average_error_rate = mean(&rates);
        let status = if average_error_rate > self.settings.error_rate_threshold {
            ServiceStatus::ServerDown
        } else {
            ServiceStatus::Ok
        };

        tracing::debug!(
            window_minutes,
            samples = rates.len(),
            average_error_rate,
            status = %status,
            "health check"
        );

        Ok(HealthReport {
            status,
            average_error_rate,
            time_frame: format!("{window_minutes} minutes"),
            version: self.settings.release_version.clone(),
        })
    }
}

/// Arithmetic mean, defaulting to zero for an empty sample set.
fn mean(rates: &[f64]) -> f64 {
    if rates.is_empty() {
        return 0.0;
    }
    rates.iter().sum::<f64>() / rates.len() as f64
}
