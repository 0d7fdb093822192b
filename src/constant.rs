pub mod app_meta {
    pub const LABEL: &str = "voucher";
    // epoch of the generated order IDs, 2022-01-01T00:00:00Z,
    // seconds-since-epoch fits 31 bits until mid 2090s
    pub const ID_EPOCH_SECS: i64 = 1640995200;
    pub const BIZ_PREFIX_ORDER: &str = "order";
}

pub const ENV_VAR_SYS_BASE_PATH: &str = "SYS_BASE_PATH";
pub const ENV_VAR_SERVICE_BASE_PATH: &str = "SERVICE_BASE_PATH";
pub const ENV_VAR_CONFIG_FILE_PATH: &str = "CONFIG_FILE_PATH";

pub const EXPECTED_ENV_VAR_LABELS: [&str; 3] = [
    ENV_VAR_SYS_BASE_PATH,
    ENV_VAR_SERVICE_BASE_PATH,
    ENV_VAR_CONFIG_FILE_PATH,
];

pub mod hard_limit {
    pub const MAX_ITEMS_STORED_PER_MODEL: u32 = 2200u32;
    pub const MAX_DB_CONNECTIONS: u32 = 10000u32;
    pub const MAX_SECONDS_DB_IDLE: u16 = 600u16;
    // capacity bound of the in-process order-task queue, overflow is
    // treated as exceptional, see `usecase::AppOrderTaskQueue`
    pub const MAX_ORDER_TASKS_PENDING: usize = 8192;
}

// key prefixes in the shared key-value store, all callers build keys
// through these constants so one keyspace scan tells the whole story
pub mod keyspace {
    pub const CACHE_SHOP_PREFIX: &str = "cache:shop:";
    pub const CACHE_SHOP_CATEGORY_KEY: &str = "cache:shop-category:all";
    pub const LOCK_PREFIX: &str = "lock:";
    pub const LOCK_CACHE_REBUILD_PREFIX: &str = "cache-rebuild:";
    pub const LOCK_ORDER_USER_PREFIX: &str = "order-user:";
    pub const DAILY_COUNTER_PREFIX: &str = "incr:";
    pub const SECKILL_STOCK_PREFIX: &str = "seckill:stock:";
    pub const SECKILL_BUYERS_PREFIX: &str = "seckill:buyers:";
}

pub mod logging {
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub enum Level {
        TRACE,
        DEBUG,
        INFO,
        WARNING,
        ERROR,
        FATAL,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Destination {
        CONSOLE,
        LOCALFS,
    }
}
