use std::boxed::Box;
use std::future::Future;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Local as LocalTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AppCacheCfg;
use crate::constant::keyspace;
use crate::datastore::AbstSharedKValStore;
use crate::error::{AppError, AppErrorCode};
use crate::lock::{AbstDistributedLock, AppDistributedLock};
use crate::logging::{app_log_event, AppLogContext, AppLogLevel};

/// wrapper persisted for always-available entries, the expiry lives in the
/// payload instead of the store TTL so readers never hit an absent key
#[derive(Serialize, Deserialize)]
pub struct AppCacheWrapper<T> {
    pub data: T,
    pub expire_time: DateTime<FixedOffset>,
}

/// cache-aside helper over the shared key-value store. Values are stored
/// as JSON, an existing key with empty payload records a backend miss so
/// repeated lookups of nonexistent IDs stop at the cache.
pub struct AppCacheClient {
    kvstore: Arc<Box<dyn AbstSharedKValStore>>,
    logctx: Arc<AppLogContext>,
    null_entry_ttl: Duration,
    rebuild_lock_ttl: Duration,
}

impl AppCacheClient {
    pub fn new(
        kvstore: Arc<Box<dyn AbstSharedKValStore>>,
        logctx: Arc<AppLogContext>,
        cfg: &AppCacheCfg,
    ) -> Self {
        Self {
            kvstore,
            logctx,
            null_entry_ttl: Duration::seconds(cfg.null_entry_ttl_secs as i64),
            rebuild_lock_ttl: Duration::seconds(cfg.rebuild_lock_ttl_secs as i64),
        }
    }

    pub async fn set_serialized<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> DefaultResult<(), AppError> {
        let serial = serde_json::to_string(value)?;
        self.kvstore.set(key, serial, Some(ttl)).await
    }

    pub async fn set_with_logical_expiry<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        valid_for: Duration,
    ) -> DefaultResult<(), AppError> {
        let serial = Self::encode_wrapper(value, valid_for)?;
        self.kvstore.set(key, serial, None).await
    }

    /// cache-aside read, `fetch` loads from the backing repository on miss.
    /// A backend miss is recorded as the empty sentinel with a short TTL
    /// and reported as `Ok(None)`.
    pub async fn query_with_null_guard<T, F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        fetch: F,
    ) -> DefaultResult<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = DefaultResult<Option<T>, AppError>> + Send,
    {
        if let Some(serial) = self.kvstore.get(key.as_str()).await? {
            if serial.is_empty() {
                return Ok(None); // cached backend miss
            }
            let obj = Self::decode_payload::<T>(key.as_str(), serial.as_str())?;
            return Ok(Some(obj));
        }
        match fetch().await? {
            Some(value) => {
                self.set_serialized(key.as_str(), &value, ttl).await?;
                Ok(Some(value))
            }
            None => {
                self.kvstore
                    .set(key.as_str(), String::new(), Some(self.null_entry_ttl))
                    .await?;
                Ok(None)
            }
        }
    } // end of fn query_with_null_guard

    /// read of a pre-warmed entry wrapped with a logical expiry. A stale
    /// wrapper is returned to the caller right away while at most one
    /// background task per key re-runs `fetch` and re-warms the entry,
    /// guarded by the per-key rebuild lock. An absent key yields
    /// `Ok(None)` without touching the store.
    pub async fn query_with_logical_expiry<T, F, Fut>(
        &self,
        key: String,
        valid_for: Duration,
        fetch: F,
    ) -> DefaultResult<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DefaultResult<Option<T>, AppError>> + Send + 'static,
    {
        let serial = match self.kvstore.get(key.as_str()).await? {
            Some(s) => s,
            None => {
                return Ok(None);
            }
        };
        let wrapper = Self::decode_payload::<AppCacheWrapper<T>>(key.as_str(), serial.as_str())?;
        let timenow = LocalTime::now().fixed_offset();
        if wrapper.expire_time > timenow {
            return Ok(Some(wrapper.data));
        }
        let resource = format!("{}{}", keyspace::LOCK_CACHE_REBUILD_PREFIX, key);
        let rebuild_lock = AppDistributedLock::new(self.kvstore.clone(), resource.as_str());
        if rebuild_lock.try_acquire(self.rebuild_lock_ttl).await? {
            let (kvstore, logctx) = (self.kvstore.clone(), self.logctx.clone());
            tokio::spawn(Self::rebuild_entry(
                kvstore,
                logctx,
                rebuild_lock,
                key,
                valid_for,
                fetch,
            ));
        } // losing the lock race means some other caller already rebuilds
        Ok(Some(wrapper.data))
    } // end of fn query_with_logical_expiry

    async fn rebuild_entry<T, F, Fut>(
        kvstore: Arc<Box<dyn AbstSharedKValStore>>,
        logctx: Arc<AppLogContext>,
        rebuild_lock: AppDistributedLock,
        key: String,
        valid_for: Duration,
        fetch: F,
    ) where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DefaultResult<Option<T>, AppError>> + Send + 'static,
    {
        match fetch().await {
            Ok(Some(value)) => match Self::encode_wrapper(&value, valid_for) {
                Ok(serial) => {
                    if let Err(e) = kvstore.set(key.as_str(), serial, None).await {
                        app_log_event!(logctx, AppLogLevel::ERROR, "save, key:{}, {}", key, e);
                    }
                }
                Err(e) => {
                    app_log_event!(logctx, AppLogLevel::ERROR, "encode, key:{}, {}", key, e);
                }
            },
            Ok(None) => {
                app_log_event!(logctx, AppLogLevel::WARNING, "record gone, key:{}", key);
            }
            Err(e) => {
                app_log_event!(logctx, AppLogLevel::ERROR, "fetch, key:{}, {}", key, e);
            }
        }
        // the unlock runs no matter how the rebuild above went
        if let Err(e) = rebuild_lock.release().await {
            app_log_event!(logctx, AppLogLevel::ERROR, "unlock, key:{}, {}", key, e);
        }
    } // end of fn rebuild_entry

    fn encode_wrapper<T: Serialize>(
        value: &T,
        valid_for: Duration,
    ) -> DefaultResult<String, AppError> {
        let wrapper = AppCacheWrapper {
            data: value,
            expire_time: LocalTime::now().fixed_offset() + valid_for,
        };
        let serial = serde_json::to_string(&wrapper)?;
        Ok(serial)
    }

    fn decode_payload<T: DeserializeOwned>(
        key: &str,
        serial: &str,
    ) -> DefaultResult<T, AppError> {
        serde_json::from_str::<T>(serial).map_err(|e| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("cache-payload, key:{}, error:{}", key, e)),
        })
    } // a corrupted payload is a hard error for the read, callers must
      // never receive garbage silently
} // end of impl AppCacheClient
