use super::kv_store::{KeyValueStore, StoreError};
use crate::domain::{
    normalize_interval_minutes, value_as_number, AccountConfig, AccountConfigPatch,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

const ACCOUNTS_KEY: &str = "accounts";
const INTERVAL_KEY: &str = "check_interval_minutes";
const NOTIFY_STATE_PREFIX: &str = "last_notified:";
const LAST_USAGE_PREFIX: &str = "last_usage:";

/// Typed view over the key-value store. Missing or malformed values read as defaults.
pub struct SettingsStore<K>
where
    K: KeyValueStore,
{
    kv: Arc<K>,
    default_interval_minutes: u32,
    /// Serializes read-modify-write of the `accounts` record.
    accounts_lock: Mutex<()>,
}

impl<K> SettingsStore<K>
where
    K: KeyValueStore,
{
    pub fn new(kv: Arc<K>, default_interval_minutes: u32) -> Self {
        Self {
            kv,
            default_interval_minutes,
            accounts_lock: Mutex::new(()),
        }
    }

    pub fn default_interval_minutes(&self) -> u32 {
        self.default_interval_minutes
    }

    pub async fn account_configs(&self) -> Result<HashMap<String, AccountConfig>, StoreError> {
        let raw = match self.kv.get(ACCOUNTS_KEY).await? {
            Some(Value::Object(map)) => map,
            Some(other) => {
                warn!(value = %other, "Account settings record is not a map, ignoring it");
                return Ok(HashMap::new());
            }
            None => return Ok(HashMap::new()),
        };

        let mut configs = HashMap::with_capacity(raw.len());
        for (account_id, value) in raw {
            let mut config = match serde_json::from_value::<AccountConfig>(value) {
                Ok(config) => config,
                Err(e) => {
                    warn!(account_id = %account_id, error = %e, "Malformed account settings, using defaults");
                    AccountConfig::new(account_id.clone())
                }
            };
            config.account_id = account_id.clone();
            configs.insert(account_id, config);
        }
        Ok(configs)
    }

    pub async fn account_config(&self, account_id: &str) -> Result<AccountConfig, StoreError> {
        Ok(self
            .account_configs()
            .await?
            .remove(account_id)
            .unwrap_or_else(|| AccountConfig::new(account_id)))
    }

    /// Merges `patch` onto the stored config (or the defaults) and writes the record back.
    pub async fn save_account_config(
        &self,
        account_id: &str,
        patch: &AccountConfigPatch,
    ) -> Result<AccountConfig, StoreError> {
        let _guard = self.accounts_lock.lock().await;
        let mut configs = self.account_configs().await?;
        let config = configs
            .entry(account_id.to_string())
            .or_insert_with(|| AccountConfig::new(account_id));
        config.apply(patch);
        let saved = config.clone();

        let record = serde_json::to_value(&configs).map_err(|e| StoreError::InvalidData {
            key: ACCOUNTS_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.kv.set(ACCOUNTS_KEY, record).await?;
        Ok(saved)
    }

    pub async fn has_interval(&self) -> Result<bool, StoreError> {
        Ok(self.kv.get(INTERVAL_KEY).await?.is_some())
    }

    pub async fn interval_minutes(&self) -> Result<u32, StoreError> {
        let raw = self
            .kv
            .get(INTERVAL_KEY)
            .await?
            .as_ref()
            .and_then(value_as_number)
            .unwrap_or(f64::NAN);
        Ok(normalize_interval_minutes(raw, self.default_interval_minutes))
    }

    /// Stores the interval floored to whole minutes and returns the stored value.
    pub async fn set_interval_minutes(&self, raw_minutes: f64) -> Result<u32, StoreError> {
        let minutes = normalize_interval_minutes(raw_minutes, self.default_interval_minutes);
        self.kv.set(INTERVAL_KEY, Value::from(minutes)).await?;
        Ok(minutes)
    }

    /// Last recorded usage percentage; 0 when never recorded.
    pub async fn last_notified(&self, account_id: &str) -> Result<f64, StoreError> {
        Ok(self
            .kv
            .get(&notify_state_key(account_id))
            .await?
            .as_ref()
            .and_then(value_as_number)
            .unwrap_or(0.0))
    }

    pub async fn set_last_notified(&self, account_id: &str, pct: f64) -> Result<(), StoreError> {
        self.kv
            .set(&notify_state_key(account_id), pct_value(pct))
            .await
    }

    /// Unrounded percentage from the last measurement; 0 when never measured
    /// or when the account stopped being monitored.
    pub async fn last_usage(&self, account_id: &str) -> Result<f64, StoreError> {
        Ok(self
            .kv
            .get(&last_usage_key(account_id))
            .await?
            .as_ref()
            .and_then(value_as_number)
            .unwrap_or(0.0))
    }

    pub async fn set_last_usage(&self, account_id: &str, pct: f64) -> Result<(), StoreError> {
        self.kv
            .set(&last_usage_key(account_id), pct_value(pct))
            .await
    }
}

fn pct_value(pct: f64) -> Value {
    serde_json::Number::from_f64(pct)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

fn last_usage_key(account_id: &str) -> String {
    format!("{}{}", LAST_USAGE_PREFIX, account_id)
}

fn notify_state_key(account_id: &str) -> String {
    format!("{}{}", NOTIFY_STATE_PREFIX, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryKeyValueStore;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn store() -> (Arc<InMemoryKeyValueStore>, SettingsStore<InMemoryKeyValueStore>) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        (kv.clone(), SettingsStore::new(kv, 60))
    }

    #[tokio::test]
    async fn missing_values_read_as_defaults() {
        let (_, settings) = store();
        assert!(settings.account_configs().await.unwrap().is_empty());
        assert_eq!(
            settings.account_config("a").await.unwrap(),
            AccountConfig::new("a")
        );
        assert_eq!(settings.interval_minutes().await.unwrap(), 60);
        assert!(!settings.has_interval().await.unwrap());
        assert_eq!(settings.last_notified("a").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn save_merges_into_existing_record() {
        let (kv, settings) = store();
        settings
            .save_account_config(
                "a",
                &AccountConfigPatch {
                    limit_bytes: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let saved = settings
            .save_account_config(
                "a",
                &AccountConfigPatch {
                    threshold_pct: Some(90),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.limit_bytes, 100);
        assert_eq!(saved.threshold_pct, 90);

        let record = kv.get("accounts").await.unwrap().unwrap();
        assert_eq!(record["a"]["limit_bytes"], json!(100));
    }

    #[tokio::test]
    async fn malformed_interval_falls_back_to_default() {
        let (kv, settings) = store();
        kv.set("check_interval_minutes", json!("soon")).await.unwrap();
        assert_eq!(settings.interval_minutes().await.unwrap(), 60);

        assert_eq!(settings.set_interval_minutes(0.5).await.unwrap(), 0);
        assert_eq!(settings.interval_minutes().await.unwrap(), 0);
        assert_eq!(settings.set_interval_minutes(45.0).await.unwrap(), 45);
        assert_eq!(settings.interval_minutes().await.unwrap(), 45);
    }

    #[tokio::test]
    async fn notify_state_is_keyed_per_account() {
        let (kv, settings) = store();
        settings.set_last_notified("a", 85.0).await.unwrap();
        assert_eq!(settings.last_notified("a").await.unwrap(), 85.0);
        assert_eq!(settings.last_notified("b").await.unwrap(), 0.0);
        assert_eq!(kv.get("last_notified:a").await.unwrap(), Some(json!(85.0)));
    }

    #[tokio::test]
    async fn malformed_account_entry_reads_as_default() {
        let (kv, settings) = store();
        kv.set("accounts", json!({ "a": "garbage", "b": { "limit_bytes": 10 } }))
            .await
            .unwrap();
        let configs = settings.account_configs().await.unwrap();
        assert_eq!(configs["a"], AccountConfig::new("a"));
        assert_eq!(configs["b"].account_id, "b");
        assert_eq!(configs["b"].limit_bytes, 10);
    }

    /// Store whose reads yield for a while, so overlapping saves interleave.
    #[derive(Default)]
    struct SlowReadStore {
        inner: InMemoryKeyValueStore,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for SlowReadStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_saves_for_different_accounts_both_persist() {
        let settings = SettingsStore::new(Arc::new(SlowReadStore::default()), 60);
        let patch = AccountConfigPatch {
            limit_bytes: Some(100),
            ..Default::default()
        };

        let (a, b) = tokio::join!(
            settings.save_account_config("a", &patch),
            settings.save_account_config("b", &patch)
        );
        a.unwrap();
        b.unwrap();

        let configs = settings.account_configs().await.unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs["a"].limit_bytes, 100);
        assert_eq!(configs["b"].limit_bytes, 100);
    }

    #[tokio::test]
    async fn last_usage_keeps_full_precision() {
        let (kv, settings) = store();
        assert_eq!(settings.last_usage("a").await.unwrap(), 0.0);
        settings.set_last_usage("a", 79.96).await.unwrap();
        assert_eq!(settings.last_usage("a").await.unwrap(), 79.96);
        assert_eq!(kv.get("last_usage:a").await.unwrap(), Some(json!(79.96)));
    }

    #[test]
    fn numeric_strings_are_read_leniently() {
        let (kv, settings) = store();
        tokio_test::block_on(async {
            assert_ok!(kv.set("last_notified:a", json!("91.5")).await);
            assert_ok!(kv.set("last_notified:b", json!({ "pct": 3 })).await);
            assert_ok!(kv.set("check_interval_minutes", json!("30.9")).await);

            assert_eq!(assert_ok!(settings.last_notified("a").await), 91.5);
            assert_eq!(assert_ok!(settings.last_notified("b").await), 0.0);
            assert_eq!(assert_ok!(settings.interval_minutes().await), 30);
        });
    }
}
