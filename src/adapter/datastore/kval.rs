use std::collections::{HashMap, HashSet};
use std::result::Result as DefaultResult;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Local as LocalTime};
use tokio::sync::Mutex;

use crate::config::AppInMemoryDbCfg;
use crate::error::{AppError, AppErrorCode};

// return codes of the reservation script, the whole script runs under one
// guard acquisition so concurrent callers always observe it as indivisible
pub mod reserve_script_code {
    pub const RESERVED: u8 = 0;
    pub const OUT_OF_STOCK: u8 = 1;
    pub const DUPLICATE_MEMBER: u8 = 2;
}

/// shared key-value store seen by every process instance of the platform,
/// entries are typed and each may carry its own expiry honored on access.
/// The two `run_*_script` operations are the store-side scripts other
/// components rely on for their atomicity guarantees.
#[async_trait]
pub trait AbstSharedKValStore: Send + Sync {
    async fn get(&self, key: &str) -> DefaultResult<Option<String>, AppError>;
    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> DefaultResult<(), AppError>;
    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> DefaultResult<bool, AppError>;
    async fn delete(&self, keys: Vec<String>) -> DefaultResult<usize, AppError>;
    async fn incr(&self, key: &str) -> DefaultResult<i64, AppError>;
    async fn hash_set_fields(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> DefaultResult<(), AppError>;
    async fn hash_get_all(&self, key: &str) -> DefaultResult<HashMap<String, String>, AppError>;
    async fn zset_add(&self, key: &str, member: &str, score: f64) -> DefaultResult<(), AppError>;
    async fn zset_score(&self, key: &str, member: &str) -> DefaultResult<Option<f64>, AppError>;
    // members ordered by ascending score, rank range `[offset, offset + limit)`
    async fn zset_range_by_rank(
        &self,
        key: &str,
        offset: usize,
        limit: usize,
    ) -> DefaultResult<Vec<String>, AppError>;
    // delete `key` only when it currently holds `expect`, in one step
    async fn run_compare_delete_script(
        &self,
        key: &str,
        expect: &str,
    ) -> DefaultResult<bool, AppError>;
    // decrement the counter at `stock_key` if it is still positive AND
    // `member` has not joined `buyers_key` yet, then record the member,
    // see `reserve_script_code` for the outcome values
    async fn run_reserve_script(
        &self,
        stock_key: &str,
        buyers_key: &str,
        member: &str,
    ) -> DefaultResult<u8, AppError>;
} // end of trait AbstSharedKValStore

enum StoredValue {
    Text(String),
    Hash(HashMap<String, String>),
    SortedSet(Vec<(String, f64)>), // kept ordered by (score, member)
    Set(HashSet<String>),
}

struct StoredEntry {
    value: StoredValue,
    expire_at: Option<DateTime<FixedOffset>>,
}

impl StoredEntry {
    fn expired(&self, t: &DateTime<FixedOffset>) -> bool {
        if let Some(exp) = self.expire_at.as_ref() {
            exp <= t
        } else {
            false
        }
    }
}

type AllEntries = HashMap<String, StoredEntry>;

pub struct AppSharedKValStore {
    max_items: u32,
    entries: Mutex<AllEntries>,
}

impl AppSharedKValStore {
    pub fn new(cfg: &AppInMemoryDbCfg) -> Self {
        Self {
            max_items: cfg.max_items,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn _expire_time(ttl: Duration) -> DateTime<FixedOffset> {
        LocalTime::now().fixed_offset() + ttl
    }

    // drops the entry if its expiry elapsed, so expired keys behave
    // exactly like absent ones for every operation
    fn _purge_expired(_map: &mut AllEntries, key: &str) {
        let timenow = LocalTime::now().fixed_offset();
        let gone = if let Some(entry) = _map.get(key) {
            entry.expired(&timenow)
        } else {
            false
        };
        if gone {
            _map.remove(key);
        }
    }

    fn _check_capacity(&self, _map: &AllEntries, newkey: &str) -> DefaultResult<(), AppError> {
        if !_map.contains_key(newkey) && self.max_items as usize <= _map.len() {
            let msg = format!("{}, {}, {}", module_path!(), line!(), newkey);
            Err(AppError {
                detail: Some(msg),
                code: AppErrorCode::ExceedingMaxLimit,
            })
        } else {
            Ok(())
        }
    }

    fn _type_mismatch(key: &str) -> AppError {
        AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("type-mismatch, key:{key}")),
        }
    }

    fn _parse_counter(key: &str, serial: &str) -> DefaultResult<i64, AppError> {
        serial.parse::<i64>().map_err(|e| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("counter, key:{}, error:{}", key, e)),
        })
    }
} // end of impl AppSharedKValStore

#[async_trait]
impl AbstSharedKValStore for AppSharedKValStore {
    async fn get(&self, key: &str) -> DefaultResult<Option<String>, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        match _map.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Text(s) => Ok(Some(s.clone())),
                _others => Err(Self::_type_mismatch(key)),
            },
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> DefaultResult<(), AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        self._check_capacity(&_map, key)?;
        let entry = StoredEntry {
            value: StoredValue::Text(value),
            expire_at: ttl.map(Self::_expire_time),
        };
        _map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> DefaultResult<bool, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        if _map.contains_key(key) {
            Ok(false)
        } else {
            self._check_capacity(&_map, key)?;
            let entry = StoredEntry {
                value: StoredValue::Text(value),
                expire_at: Some(Self::_expire_time(ttl)),
            };
            _map.insert(key.to_string(), entry);
            Ok(true)
        }
    }

    async fn delete(&self, keys: Vec<String>) -> DefaultResult<usize, AppError> {
        let mut _map = self.entries.lock().await;
        let num_removed = keys
            .iter()
            .filter(|key| _map.remove(key.as_str()).is_some())
            .count();
        Ok(num_removed)
    }

    async fn incr(&self, key: &str) -> DefaultResult<i64, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        let newval = match _map.get_mut(key) {
            Some(entry) => match &mut entry.value {
                StoredValue::Text(s) => {
                    let v = Self::_parse_counter(key, s.as_str())? + 1;
                    *s = v.to_string();
                    v
                }
                _others => {
                    return Err(Self::_type_mismatch(key));
                }
            },
            None => {
                self._check_capacity(&_map, key)?;
                let entry = StoredEntry {
                    value: StoredValue::Text("1".to_string()),
                    expire_at: None,
                };
                _map.insert(key.to_string(), entry);
                1i64
            }
        };
        Ok(newval)
    } // end of fn incr

    async fn hash_set_fields(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> DefaultResult<(), AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        match _map.get_mut(key) {
            Some(entry) => match &mut entry.value {
                StoredValue::Hash(h) => {
                    h.extend(fields);
                    Ok(())
                }
                _others => Err(Self::_type_mismatch(key)),
            },
            None => {
                self._check_capacity(&_map, key)?;
                let entry = StoredEntry {
                    value: StoredValue::Hash(HashMap::from_iter(fields)),
                    expire_at: None,
                };
                _map.insert(key.to_string(), entry);
                Ok(())
            }
        }
    }

    async fn hash_get_all(&self, key: &str) -> DefaultResult<HashMap<String, String>, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        match _map.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Hash(h) => Ok(h.clone()),
                _others => Err(Self::_type_mismatch(key)),
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> DefaultResult<(), AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        if !_map.contains_key(key) {
            self._check_capacity(&_map, key)?;
            let entry = StoredEntry {
                value: StoredValue::SortedSet(Vec::new()),
                expire_at: None,
            };
            _map.insert(key.to_string(), entry);
        }
        let entry = _map.get_mut(key).unwrap();
        match &mut entry.value {
            StoredValue::SortedSet(zs) => {
                zs.retain(|(m, _s)| m.as_str() != member);
                zs.push((member.to_string(), score));
                zs.sort_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.0.cmp(&b.0))
                });
                Ok(())
            }
            _others => Err(Self::_type_mismatch(key)),
        }
    } // end of fn zset_add

    async fn zset_score(&self, key: &str, member: &str) -> DefaultResult<Option<f64>, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        match _map.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::SortedSet(zs) => {
                    let found = zs
                        .iter()
                        .find(|(m, _s)| m.as_str() == member)
                        .map(|(_m, s)| *s);
                    Ok(found)
                }
                _others => Err(Self::_type_mismatch(key)),
            },
            None => Ok(None),
        }
    }

    async fn zset_range_by_rank(
        &self,
        key: &str,
        offset: usize,
        limit: usize,
    ) -> DefaultResult<Vec<String>, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        match _map.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::SortedSet(zs) => {
                    let out = zs
                        .iter()
                        .skip(offset)
                        .take(limit)
                        .map(|(m, _s)| m.clone())
                        .collect::<Vec<String>>();
                    Ok(out)
                }
                _others => Err(Self::_type_mismatch(key)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn run_compare_delete_script(
        &self,
        key: &str,
        expect: &str,
    ) -> DefaultResult<bool, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, key);
        let matched = match _map.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Text(s) => s.as_str() == expect,
                _others => false,
            },
            None => false,
        };
        if matched {
            _map.remove(key);
        }
        Ok(matched)
    } // check and delete happen while the same guard is held

    async fn run_reserve_script(
        &self,
        stock_key: &str,
        buyers_key: &str,
        member: &str,
    ) -> DefaultResult<u8, AppError> {
        let mut _map = self.entries.lock().await;
        Self::_purge_expired(&mut _map, stock_key);
        Self::_purge_expired(&mut _map, buyers_key);
        let num_stock = match _map.get(stock_key) {
            Some(entry) => match &entry.value {
                StoredValue::Text(s) => Self::_parse_counter(stock_key, s.as_str())?,
                _others => {
                    return Err(Self::_type_mismatch(stock_key));
                }
            },
            None => 0, // stock never preloaded, nothing to sell
        };
        if num_stock <= 0 {
            return Ok(reserve_script_code::OUT_OF_STOCK);
        }
        if !_map.contains_key(buyers_key) {
            self._check_capacity(&_map, buyers_key)?;
            let entry = StoredEntry {
                value: StoredValue::Set(HashSet::new()),
                expire_at: None,
            };
            _map.insert(buyers_key.to_string(), entry);
        }
        let buyers = match &mut _map.get_mut(buyers_key).unwrap().value {
            StoredValue::Set(s) => s,
            _others => {
                return Err(Self::_type_mismatch(buyers_key));
            }
        };
        if buyers.contains(member) {
            return Ok(reserve_script_code::DUPLICATE_MEMBER);
        }
        buyers.insert(member.to_string());
        if let Some(entry) = _map.get_mut(stock_key) {
            if let StoredValue::Text(s) = &mut entry.value {
                *s = (num_stock - 1).to_string();
            }
        }
        Ok(reserve_script_code::RESERVED)
    } // end of fn run_reserve_script
} // end of impl AbstSharedKValStore for AppSharedKValStore
