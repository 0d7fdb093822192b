use async_trait::async_trait;
use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use crate::error::{AppError, AppErrorCode};
use crate::model::{ShopCategoryModel, ShopModel, VoucherModel, VoucherOrderModel};
use crate::AppDataStoreContext;

mod in_mem;
mod seckill;
// make in-memory repo visible only for testing purpose
pub use in_mem::order::VoucherOrderInMemRepo;
pub use in_mem::shop::ShopInMemRepo;
pub use in_mem::voucher::VoucherInMemRepo;
pub use seckill::SeckillStockKvRepo;

#[cfg(feature = "mariadb")]
mod mariadb;

#[cfg(feature = "mariadb")]
use mariadb::order::VoucherOrderMariaDbRepo;

#[cfg(feature = "mariadb")]
use mariadb::shop::ShopMariaDbRepo;

#[cfg(feature = "mariadb")]
use mariadb::voucher::VoucherMariaDbRepo;

/// outcome of the fast-path reservation, mapped one-to-one from the
/// return code of the store-side reservation script
#[derive(Debug, Clone, PartialEq)]
pub enum AppReserveOutcome {
    Reserved,
    OutOfStock,
    AlreadyTaken,
}

// the repository instance may be used across an await,
// the future created by app callers has to be able to pass to different
// threads, it is the reason to add `Send` and `Sync` as super-traits
#[async_trait]
pub trait AbsVoucherRepo: Sync + Send {
    async fn fetch(&self, voucher_id: u64) -> DefaultResult<Option<VoucherModel>, AppError>;
    async fn save(&self, item: VoucherModel) -> DefaultResult<(), AppError>;
    /// durable guarded decrement, succeeds only while the remaining stock
    /// is still positive
    async fn decrement_stock(&self, voucher_id: u64) -> DefaultResult<bool, AppError>;
}

#[async_trait]
pub trait AbsVoucherOrderRepo: Sync + Send {
    /// fails with `DuplicateRecord` when the user already owns an order
    /// of the same voucher
    async fn create(&self, item: VoucherOrderModel) -> DefaultResult<(), AppError>;
    async fn num_orders_of_user(
        &self,
        usr_id: u32,
        voucher_id: u64,
    ) -> DefaultResult<usize, AppError>;
    async fn fetch_by_id(&self, order_id: u64)
        -> DefaultResult<Option<VoucherOrderModel>, AppError>;
}

#[async_trait]
pub trait AbsShopRepo: Sync + Send {
    async fn fetch(&self, shop_id: u64) -> DefaultResult<Option<ShopModel>, AppError>;
    async fn save(&self, item: ShopModel) -> DefaultResult<(), AppError>;
    async fn fetch_categories(&self) -> DefaultResult<Vec<ShopCategoryModel>, AppError>;
    async fn save_categories(&self, items: Vec<ShopCategoryModel>) -> DefaultResult<(), AppError>;
}

/// eligibility check and stock reservation against the shared store, the
/// single consistency point all concurrent admission requests go through
#[async_trait]
pub trait AbsSeckillStockRepo: Sync + Send {
    async fn preload_stock(&self, voucher_id: u64, stock: u32) -> DefaultResult<(), AppError>;
    async fn try_reserve(
        &self,
        voucher_id: u64,
        usr_id: u32,
    ) -> DefaultResult<AppReserveOutcome, AppError>;
}

pub async fn app_repo_voucher(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsVoucherRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = VoucherMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = VoucherInMemRepo::build(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("in-mem".to_string()),
        })
    }
}

pub async fn app_repo_voucher_order(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsVoucherOrderRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = VoucherOrderMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = VoucherOrderInMemRepo::build(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("in-mem".to_string()),
        })
    }
}

pub async fn app_repo_shop(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsShopRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = ShopMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = ShopInMemRepo::build(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("in-mem".to_string()),
        })
    }
}

// the fast path always lives in the shared store regardless of which
// durable backend is compiled in
pub fn app_repo_seckill_stock(ds: Arc<AppDataStoreContext>) -> Box<dyn AbsSeckillStockRepo> {
    let obj = SeckillStockKvRepo::new(ds.kval.clone());
    Box::new(obj)
}
