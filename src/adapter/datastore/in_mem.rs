use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::AppInMemoryDbCfg;
use crate::error::{AppError, AppErrorCode};

// simple implementation of in-memory data storage, the durable fallback
// for environments without a SQL database server

// application callers are responsible to maintain the structure of each
// row in each table. Each element of a row is stringified regardless of
// its original type (integer, timestamp ...)
type InnerRow = Vec<String>;
type InnerTable = HashMap<String, InnerRow>;
type AllTable = HashMap<String, InnerTable>;
pub type AppInMemUpdateData = AllTable;
pub type AppInMemDeleteInfo = HashMap<String, Vec<String>>; // list of IDs per table
pub type AppInMemFetchKeys = HashMap<String, Vec<String>>; // list of IDs per table
pub type AppInMemFetchedSingleRow = InnerRow;
pub type AppInMemFetchedSingleTable = InnerTable;
pub type AppInMemFetchedData = AllTable;

pub trait AbsDStoreFilterKeyOp: Send + Sync {
    fn filter(&self, k: &String, v: &Vec<String>) -> bool;
}

/// holds the store-wide guard acquired by `fetch_acquire()`, all row
/// modifications in between go back through `save_release()`. Dropping
/// the lock without saving discards nothing but the exclusivity.
pub struct AppInMemDstoreLock {
    guard: OwnedMutexGuard<AllTable>,
}

#[async_trait]
pub trait AbstInMemoryDStore: Send + Sync {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError>;
    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError>;
    async fn fetch(&self, keys: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError>;
    // read-modify-write across rows, atomic with respect to every other
    // operation of this store
    async fn fetch_acquire(
        &self,
        keys: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError>;
    fn save_release(
        &self,
        data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError>;
    async fn delete(&self, info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError>;
    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError>;
}

pub struct AppInMemoryDStore {
    max_items_per_table: u32,
    table_map: Arc<Mutex<AllTable>>,
}

impl AppInMemoryDStore {
    pub fn new(cfg: &AppInMemoryDbCfg) -> Self {
        let t_map = HashMap::new();
        let t_map = Arc::new(Mutex::new(t_map));
        Self {
            table_map: t_map,
            max_items_per_table: cfg.max_items,
        }
    }

    fn _check_capacity(&self, _map: &AllTable) -> DefaultResult<(), AppError> {
        let mut invalid = _map
            .iter()
            .filter(|(_, table)| self.max_items_per_table as usize <= table.len());
        if let Some((label, _)) = invalid.next() {
            let msg = format!("{}, {}, {}", module_path!(), line!(), label);
            Err(AppError {
                detail: Some(msg),
                code: AppErrorCode::ExceedingMaxLimit,
            })
        } else {
            Ok(())
        }
    }

    fn _check_table_existence(_map: &AllTable, keys: Vec<&String>) -> DefaultResult<(), AppError> {
        let mut invalid = keys.iter().filter(|label| !_map.contains_key(label.as_str()));
        if let Some(d) = invalid.next() {
            Err(AppError {
                detail: Some(d.to_string()),
                code: AppErrorCode::DataTableNotExist,
            })
        } else {
            Ok(())
        }
    }

    fn _save(_map: &mut AllTable, _data: AppInMemUpdateData) -> usize {
        _data
            .into_iter()
            .map(|(label, d_grp)| {
                let table = _map.get_mut(label.as_str()).unwrap();
                d_grp
                    .into_iter()
                    .map(|(id, row)| {
                        table.insert(id, row);
                    })
                    .count()
            })
            .sum()
    }

    fn _fetch(_map: &AllTable, _info: AppInMemFetchKeys) -> AppInMemFetchedData {
        let rs_a = _info
            .into_iter()
            .map(|(label, ids)| {
                let table = _map.get(label.as_str()).unwrap();
                let rs_t = ids
                    .iter()
                    .filter(|id| table.contains_key(id.as_str()))
                    .map(|id| {
                        let row = table.get(id).unwrap();
                        (id.clone(), row.clone())
                    })
                    .collect::<Vec<(String, InnerRow)>>();
                (label, HashMap::from_iter(rs_t))
            })
            .collect::<Vec<(String, InnerTable)>>();
        HashMap::from_iter(rs_a)
    }
} // end of impl AppInMemoryDStore

#[async_trait]
impl AbstInMemoryDStore for AppInMemoryDStore {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError> {
        let mut _map = self.table_map.lock().await;
        if !_map.contains_key(label) {
            let newtable = HashMap::new();
            _map.insert(label.to_string(), newtable);
        }
        Ok(())
    }

    async fn save(&self, _data: AppInMemUpdateData) -> DefaultResult<usize, AppError> {
        let mut _map = self.table_map.lock().await;
        let unchecked_labels = _data.keys().collect::<Vec<&String>>();
        Self::_check_table_existence(&_map, unchecked_labels)?;
        self._check_capacity(&_map)?;
        let tot_cnt = Self::_save(&mut _map, _data);
        self._check_capacity(&_map)?;
        Ok(tot_cnt)
    }

    async fn fetch(&self, _info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError> {
        let _map = self.table_map.lock().await;
        let unchecked_labels = _info.keys().collect::<Vec<&String>>();
        Self::_check_table_existence(&_map, unchecked_labels)?;
        Ok(Self::_fetch(&_map, _info))
    }

    async fn fetch_acquire(
        &self,
        _info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError> {
        let guard = self.table_map.clone().lock_owned().await;
        let unchecked_labels = _info.keys().collect::<Vec<&String>>();
        Self::_check_table_existence(&guard, unchecked_labels)?;
        let fetched = Self::_fetch(&guard, _info);
        Ok((fetched, AppInMemDstoreLock { guard }))
    }

    fn save_release(
        &self,
        _data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError> {
        let mut lock = lock;
        let unchecked_labels = _data.keys().collect::<Vec<&String>>();
        Self::_check_table_existence(&lock.guard, unchecked_labels)?;
        let tot_cnt = Self::_save(&mut lock.guard, _data);
        self._check_capacity(&lock.guard)?;
        Ok(tot_cnt)
    } // lock is dropped at the end of this function scope

    async fn delete(&self, _info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError> {
        let mut _map = self.table_map.lock().await;
        let unchecked_labels = _info.keys().collect::<Vec<&String>>();
        Self::_check_table_existence(&_map, unchecked_labels)?;
        let tot_cnt = _info
            .iter()
            .map(|(label, ids)| {
                let table = _map.get_mut(label.as_str()).unwrap();
                ids.iter()
                    .map(|id| {
                        table.remove(id);
                    })
                    .count()
            })
            .sum();
        Ok(tot_cnt)
    }

    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError> {
        let _map = self.table_map.lock().await;
        if let Some(table) = _map.get(tbl_label.as_str()) {
            let out = table
                .iter()
                .filter(|(k, v)| op.filter(k, v))
                .map(|(k, _v)| k.clone())
                .collect::<Vec<String>>();
            Ok(out)
        } else {
            Err(AppError {
                code: AppErrorCode::DataTableNotExist,
                detail: Some(tbl_label),
            })
        }
    }
} // end of impl AbstInMemoryDStore for AppInMemoryDStore
