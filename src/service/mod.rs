//! Request-scoped service layer.
//!
//! Thin wrappers around the store, one per operation family. Dependencies
//! are passed at construction; no state is kept between calls.

mod config;
mod health;

pub use config::ConfigManager;
pub use health::{DEFAULT_WINDOW_MINUTES, HealthMonitor, HealthReport, ServiceStatus};

/// Static greeting for the root endpoint.
pub fn greeting() -> &'static str {
    "Hello World!"
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::db::Database;
    use crate::error::DatabaseError;
    use crate::history::ConfigRecord;

    /// In-memory store double. Upserts are atomic under one lock, matching
    /// the conflict-target guarantee of the real store.
    pub(crate) struct MemoryDb {
        queries: Mutex<Vec<(DateTime<Utc>, f64)>>,
        configs: Mutex<HashMap<String, ConfigRecord>>,
        unavailable: bool,
    }

    impl MemoryDb {
        pub(crate) fn new() -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
                configs: Mutex::new(HashMap::new()),
                unavailable: false,
            }
        }

        /// A store whose every call fails as unreachable.
        pub(crate) fn unreachable() -> Self {
            Self {
                unavailable: true,
                ..Self::new()
            }
        }

        pub(crate) fn push_query(&self, at: DateTime<Utc>, error_rate: f64) {
            self.queries.lock().unwrap().push((at, error_rate));
        }

        pub(crate) fn config_count(&self) -> usize {
            self.configs.lock().unwrap().len()
        }

        fn check(&self) -> Result<(), DatabaseError> {
            if self.unavailable {
                return Err(DatabaseError::Pool("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Database for MemoryDb {
        async fn error_rates_since(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<f64>, DatabaseError> {
            self.check()?;
            Ok(self
                .queries
                .lock()
                .unwrap()
                .iter()
                .filter(|(at, _)| *at >= cutoff)
                .map(|(_, rate)| *rate)
                .collect())
        }

        async fn get_config(&self, key: &str) -> Result<Option<ConfigRecord>, DatabaseError> {
            self.check()?;
            Ok(self.configs.lock().unwrap().get(key).cloned())
        }

        async fn upsert_config(
            &self,
            key: &str,
            value: &serde_json::Value,
            metadata: &serde_json::Value,
        ) -> Result<ConfigRecord, DatabaseError> {
            self.check()?;
            let mut configs = self.configs.lock().unwrap();
            let now = Utc::now();
            let record = configs
                .entry(key.to_string())
                .and_modify(|record| {
                    record.value = value.clone();
                    record.metadata = metadata.clone();
                    record.updated_at = now;
                })
                .or_insert_with(|| ConfigRecord {
                    key: key.to_string(),
                    value: value.clone(),
                    metadata: metadata.clone(),
                    created_at: now,
                    updated_at: now,
                });
            Ok(record.clone())
        }
    }
}
