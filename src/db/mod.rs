use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::history::ConfigRecord;

/// Database abstraction layer.
#[async_trait]
pub trait Database: Send + Sync {
    /// Error rates of query records created at or after `cutoff`.
    async fn error_rates_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<f64>, DatabaseError>;

    /// Look up a configuration record by key.
    async fn get_config(&self, key: &str) -> Result<Option<ConfigRecord>, DatabaseError>;

    /// Create the configuration record for `key` or update it in place,
    /// as a single atomic operation.
    async fn upsert_config(
        &self,
        key: &str,
        value: &serde_json::Value,
        metadata: &serde_json::Value,
    ) -> Result<ConfigRecord, DatabaseError>;
}
