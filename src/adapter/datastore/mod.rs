mod in_mem;
mod kval;
mod sql_db;

use std::boxed::Box;
use std::sync::Arc;

use crate::config::{AppDataStoreCfg, AppServiceCfg};

pub use in_mem::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemDeleteInfo, AppInMemDstoreLock,
    AppInMemFetchKeys, AppInMemFetchedData, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
    AppInMemUpdateData, AppInMemoryDStore,
};
pub use kval::{reserve_script_code, AbstSharedKValStore, AppSharedKValStore};
pub use sql_db::AppMariaDbStore;

use crate::confidentiality::AbstractConfidentiality;
use crate::logging::{app_log_event, AppLogContext, AppLogLevel};

pub(crate) fn build_context(
    logctx: Arc<AppLogContext>,
    cfg: &AppServiceCfg,
    confidential: Arc<Box<dyn AbstractConfidentiality>>,
) -> (
    Box<dyn AbstSharedKValStore>,
    Option<Box<dyn AbstInMemoryDStore>>,
    Option<Vec<AppMariaDbStore>>,
) {
    let kval: Box<dyn AbstSharedKValStore> = Box::new(AppSharedKValStore::new(&cfg.shared_store));
    let mut inmem = None;
    let mut sqldb = None;
    for c in cfg.data_store.iter() {
        match c {
            AppDataStoreCfg::InMemory(d) => {
                let item: Box<dyn AbstInMemoryDStore> = Box::new(AppInMemoryDStore::new(d));
                inmem = Some(item);
            }
            AppDataStoreCfg::DbServer(d) => {
                if sqldb.is_none() {
                    sqldb = Some(Vec::new());
                }
                if let Some(lst) = &mut sqldb {
                    match AppMariaDbStore::try_build(d, confidential.clone()) {
                        Ok(item) => {
                            lst.push(item);
                        }
                        Err(e) => {
                            app_log_event!(logctx, AppLogLevel::ERROR, "{:?}", e);
                        }
                    }
                }
            }
        }
    }
    (kval, inmem, sqldb)
}
