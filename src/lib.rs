use std::boxed::Box;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod cache;
pub mod confidentiality;
pub mod constant;
pub mod error;
pub mod idgen;
pub mod lock;
pub mod logging;
pub mod model;
pub mod repository;
pub mod usecase;

mod config;
pub use config::{
    AppBasepathCfg, AppCacheCfg, AppCfgHardLimit, AppCfgInitArgs, AppConfidentialCfg, AppConfig,
    AppDataStoreCfg, AppDbServerCfg, AppDbServerType, AppInMemoryDbCfg, AppLogHandlerCfg,
    AppLoggerCfg, AppLoggingCfg, AppQueueOverflowPolicy, AppSeckillCfg, AppServiceCfg,
};

mod adapter;
pub use adapter::datastore;

use cache::AppCacheClient;
use confidentiality::AbstractConfidentiality;
use idgen::AppIdGenerator;
use logging::AppLogContext;

type AppLogAlias = Arc<String>;

pub struct AppDataStoreContext {
    pub kval: Arc<Box<dyn datastore::AbstSharedKValStore>>,
    pub in_mem: Option<Arc<Box<dyn datastore::AbstInMemoryDStore>>>,
    pub sql_dbs: Option<Vec<Arc<datastore::AppMariaDbStore>>>,
}

// global state shared by all tasks, every long-lived service object is
// constructed exactly once in here at process start and handed out by
// reference, nothing hides in mutable statics
pub struct AppSharedState {
    _cfg: Arc<AppConfig>,
    _log: Arc<AppLogContext>,
    dstore: Arc<AppDataStoreContext>,
    _id_gen: Arc<AppIdGenerator>,
    _cache: Arc<AppCacheClient>,
    _shutdown: Arc<AtomicBool>,
}

impl AppSharedState {
    pub fn new(
        cfg: AppConfig,
        log: AppLogContext,
        confidential: Box<dyn AbstractConfidentiality>,
    ) -> Self {
        let confidential = Arc::new(confidential);
        let log = Arc::new(log);
        let (kval, in_mem, sql_dbs) =
            datastore::build_context(log.clone(), &cfg.service, confidential);
        let kval = Arc::new(kval);
        let in_mem = in_mem.map(Arc::new);
        let sql_dbs =
            sql_dbs.map(|m| m.into_iter().map(Arc::new).collect::<Vec<_>>());
        let ds_ctx = Arc::new(AppDataStoreContext {
            kval: kval.clone(),
            in_mem,
            sql_dbs,
        });
        let id_gen = Arc::new(AppIdGenerator::new(kval.clone()));
        let cache = Arc::new(AppCacheClient::new(kval, log.clone(), &cfg.service.cache));
        Self {
            _cfg: Arc::new(cfg),
            _log: log,
            dstore: ds_ctx,
            _id_gen: id_gen,
            _cache: cache,
            _shutdown: Arc::new(AtomicBool::new(false)),
        }
    } // end of fn new

    pub fn config(&self) -> &Arc<AppConfig> {
        &self._cfg
    }

    pub fn log_context(&self) -> &Arc<AppLogContext> {
        &self._log
    }

    pub fn datastore(&self) -> Arc<AppDataStoreContext> {
        self.dstore.clone()
    }

    pub fn shared_kval_store(&self) -> Arc<Box<dyn datastore::AbstSharedKValStore>> {
        self.dstore.kval.clone()
    }

    pub fn id_generator(&self) -> Arc<AppIdGenerator> {
        self._id_gen.clone()
    }

    pub fn cache_client(&self) -> Arc<AppCacheClient> {
        self._cache.clone()
    }

    pub fn shutdown(&self) -> Arc<AtomicBool> {
        self._shutdown.clone()
    }
} // end of impl AppSharedState

impl Clone for AppSharedState {
    fn clone(&self) -> Self {
        Self {
            _cfg: self._cfg.clone(),
            _log: self._log.clone(),
            dstore: self.dstore.clone(),
            _id_gen: self._id_gen.clone(),
            _cache: self._cache.clone(),
            _shutdown: self._shutdown.clone(),
        }
    }
}
