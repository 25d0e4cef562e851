//! Runtime configuration records: validated lookups and atomic upserts.

use std::sync::Arc;

use serde_json::Value;

use crate::db::Database;
use crate::error::ServiceError;
use crate::history::ConfigRecord;

/// Longest accepted configuration key, in bytes.
const MAX_KEY_BYTES: usize = 255;

/// Manages the keyed configuration records shared across service instances.
pub struct ConfigManager {
    db: Arc<dyn Database>,
}

impl ConfigManager {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Create the record for `key` or update it in place.
    ///
    /// The write is delegated to the store as one atomic operation, so
    /// concurrent calls for the same new key cannot create duplicates.
    pub async fn upsert(
        &self,
        key: &str,
        value: Value,
        metadata: Value,
    ) -> Result<ConfigRecord, ServiceError> {
        let key = normalize_key(key)?;
        let record = self.db.upsert_config(key, &value, &metadata).await?;
        tracing::info!(key, "configuration record upserted");
        Ok(record)
    }

    /// Look up the record for `key`.
    pub async fn get(&self, key: &str) -> Result<ConfigRecord, ServiceError> {
        let key = normalize_key(key)?;
        self.db
            .get_config(key)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "config",
                key: key.to_string(),
            })
    }
}

/// Reject keys the store should never see.
fn normalize_key(key: &str) -> Result<&str, ServiceError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ServiceError::Validation(
            "config key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(ServiceError::Validation(format!(
            "config key exceeds {MAX_KEY_BYTES} bytes"
        )));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::service::testing::MemoryDb;

    fn manager(db: Arc<MemoryDb>) -> ConfigManager {
        ConfigManager::new(db)
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_any_store_call() {
        // An unreachable store proves validation short-circuits: a store
        // call would surface as StoreUnavailable instead.
        let mgr = manager(Arc::new(MemoryDb::unreachable()));

        let err = mgr.upsert("   ", json!(1), Value::Null).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = mgr.get("").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn oversized_key_is_rejected() {
        let mgr = manager(Arc::new(MemoryDb::new()));
        let key = "k".repeat(256);

        let err = mgr.upsert(&key, json!(1), Value::Null).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn keys_are_trimmed_before_storage() {
        let db = Arc::new(MemoryDb::new());
        let mgr = manager(db.clone());

        mgr.upsert("  retry_limit  ", json!(3), Value::Null)
            .await
            .unwrap();

        let record = mgr.get("retry_limit").await.unwrap();
        assert_eq!(record.key, "retry_limit");
        assert_eq!(db.config_count(), 1);
    }

    #[tokio::test]
    async fn second_upsert_updates_the_same_record() {
        let db = Arc::new(MemoryDb::new());
        let mgr = manager(db.clone());

        let created = mgr
            .upsert("retry_limit", json!(3), Value::Null)
            .await
            .unwrap();
        let updated = mgr
            .upsert("retry_limit", json!(5), json!({"source": "ops"}))
            .await
            .unwrap();

        assert_eq!(db.config_count(), 1);
        assert_eq!(updated.value, json!(5));
        assert_eq!(updated.metadata, json!({"source": "ops"}));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn concurrent_upserts_of_a_new_key_leave_one_record() {
        let db = Arc::new(MemoryDb::new());
        let mgr = manager(db.clone());

        let (a, b) = tokio::join!(
            mgr.upsert("rollout_flag", json!(true), Value::Null),
            mgr.upsert("rollout_flag", json!(false), Value::Null),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(db.config_count(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let mgr = manager(Arc::new(MemoryDb::new()));
        let err = mgr.get("unset_key").await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::NotFound { entity: "config", .. }
        ));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_unavailable() {
        let mgr = manager(Arc::new(MemoryDb::unreachable()));
        let err = mgr.get("retry_limit").await.unwrap_err();

        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
    }
}
