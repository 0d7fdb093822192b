use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::constant::keyspace;
use crate::datastore::{reserve_script_code, AbstSharedKValStore};
use crate::error::{AppError, AppErrorCode};

use super::{AbsSeckillStockRepo, AppReserveOutcome};

pub struct SeckillStockKvRepo {
    kvstore: Arc<Box<dyn AbstSharedKValStore>>,
}

impl SeckillStockKvRepo {
    pub fn new(kvstore: Arc<Box<dyn AbstSharedKValStore>>) -> Self {
        Self { kvstore }
    }

    fn stock_key(voucher_id: u64) -> String {
        format!("{}{}", keyspace::SECKILL_STOCK_PREFIX, voucher_id)
    }
    fn buyers_key(voucher_id: u64) -> String {
        format!("{}{}", keyspace::SECKILL_BUYERS_PREFIX, voucher_id)
    }
}

#[async_trait]
impl AbsSeckillStockRepo for SeckillStockKvRepo {
    async fn preload_stock(&self, voucher_id: u64, stock: u32) -> DefaultResult<(), AppError> {
        let key = Self::stock_key(voucher_id);
        self.kvstore.set(key.as_str(), stock.to_string(), None).await
    } // publish-time warm-up, the admission path never initializes stock

    async fn try_reserve(
        &self,
        voucher_id: u64,
        usr_id: u32,
    ) -> DefaultResult<AppReserveOutcome, AppError> {
        let stock_key = Self::stock_key(voucher_id);
        let buyers_key = Self::buyers_key(voucher_id);
        let member = usr_id.to_string();
        let code = self
            .kvstore
            .run_reserve_script(stock_key.as_str(), buyers_key.as_str(), member.as_str())
            .await?;
        match code {
            reserve_script_code::RESERVED => Ok(AppReserveOutcome::Reserved),
            reserve_script_code::OUT_OF_STOCK => Ok(AppReserveOutcome::OutOfStock),
            reserve_script_code::DUPLICATE_MEMBER => Ok(AppReserveOutcome::AlreadyTaken),
            _others => Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(format!("reserve-script-code:{code}")),
            }),
        }
    }
} // end of impl AbsSeckillStockRepo for SeckillStockKvRepo
