//! PostgreSQL store for the query log and configuration records.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::Database;
use crate::error::DatabaseError;

/// One logged request from the upstream query pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    pub id: Uuid,
    /// Fraction of failed downstream calls for this request, in [0, 1].
    pub error_rate: f64,
    pub created_at: DateTime<Utc>,
}

/// One named configuration value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database store for the service.
pub struct Store {
    pool: Pool,
    timeout: Duration,
}

impl Store {
    /// Create a new store and connect to the database.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url().to_string());
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        let store = Self {
            pool,
            timeout: config.timeout,
        };

        // Test connection
        store.guard("pool.connect", store.conn()).await?;

        Ok(store)
    }

    /// Run database migrations (embedded via refinery).
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        use refinery::embed_migrations;
        embed_migrations!("migrations");

        let mut client = self.pool.get().await?;
        migrations::runner()
            .run_async(&mut **client)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> Result<deadpool_postgres::Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }

    /// Get a clone of the database pool.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Bound a store operation so a wedged pool or server never hangs a
    /// request indefinitely.
    async fn guard<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DatabaseError::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }

    /// Append one request to the query log.
    ///
    /// Ingestion hook for the upstream query pipeline; the service itself
    /// only reads the log.
    pub async fn record_query(&self, error_rate: f64) -> Result<QueryRecord, DatabaseError> {
        self.guard("queries.record", async {
            let conn = self.conn().await?;
            let id = Uuid::new_v4();

            let row = conn
                .query_one(
                    "INSERT INTO queries (id, error_rate) VALUES ($1, $2) \
                     RETURNING id, error_rate, created_at",
                    &[&id, &error_rate],
                )
                .await?;

            Ok(QueryRecord {
                id: row.get("id"),
                error_rate: row.get("error_rate"),
                created_at: row.get("created_at"),
            })
        })
        .await
    }
}

#[async_trait]
impl Database for Store {
    async fn error_rates_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<f64>, DatabaseError> {
        self.guard("queries.error_rates_since", async {
            let conn = self.conn().await?;
            let rows = conn
                .query(
                    "SELECT error_rate FROM queries WHERE created_at >= $1",
                    &[&cutoff],
                )
                .await?;

            Ok(rows.iter().map(|row| row.get("error_rate")).collect())
        })
        .await
    }

    async fn get_config(&self, key: &str) -> Result<Option<ConfigRecord>, DatabaseError> {
        self.guard("config.get", async {
            let conn = self.conn().await?;
            let row = conn
                .query_opt(
                    "SELECT key, value, metadata, created_at, updated_at \
                     FROM service_config WHERE key = $1",
                    &[&key],
                )
                .await?;

            Ok(row.as_ref().map(config_record))
        })
        .await
    }

    async fn upsert_config(
        &self,
        key: &str,
        value: &serde_json::Value,
        metadata: &serde_json::Value,
    ) -> Result<ConfigRecord, DatabaseError> {
        self.guard("config.upsert", async {
            let conn = self.conn().await?;

            // Single conditional write; concurrent calls for the same key
            // serialize on the primary key.
            let row = conn
                .query_one(
                    r#"
                    INSERT INTO service_config (key, value, metadata)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (key) DO UPDATE SET
                        value = EXCLUDED.value,
                        metadata = EXCLUDED.metadata,
                        updated_at = NOW()
                    RETURNING key, value, metadata, created_at, updated_at
                    "#,
                    &[&key, &value, &metadata],
                )
                .await?;

            Ok(config_record(&row))
        })
        .await
    }
}

fn config_record(row: &tokio_postgres::Row) -> ConfigRecord {
    ConfigRecord {
        key: row.get("key"),
        value: row.get("value"),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
