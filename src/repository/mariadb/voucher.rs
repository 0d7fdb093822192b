use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::VoucherModel;

use super::super::AbsVoucherRepo;

pub(crate) struct VoucherMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl TryFrom<MySqlRow> for VoucherModel {
    type Error = AppError;
    fn try_from(row: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let voucher_id = row.try_get::<u64, usize>(0)?;
        let shop_id = row.try_get::<u64, usize>(1)?;
        let title = row.try_get::<String, usize>(2)?;
        let stock = row.try_get::<u32, usize>(3)?;
        let begin_time = row.try_get::<DateTime<Utc>, usize>(4)?.fixed_offset();
        let end_time = row.try_get::<DateTime<Utc>, usize>(5)?.fixed_offset();
        Ok(Self {
            voucher_id,
            shop_id,
            title,
            stock,
            begin_time,
            end_time,
        })
    }
}

impl VoucherMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = dbs.first().cloned().ok_or(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("mariadb".to_string()),
        })?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsVoucherRepo for VoucherMariaDbRepo {
    async fn fetch(&self, voucher_id: u64) -> DefaultResult<Option<VoucherModel>, AppError> {
        let sql_patt = "SELECT `voucher_id`,`shop_id`,`title`,`stock`,`begin_time`,`end_time` \
                        FROM `voucher_seckill` WHERE `voucher_id`=?";
        let mut conn = self._db.acquire().await?;
        let maybe_row = sqlx::query(sql_patt)
            .bind(voucher_id)
            .fetch_optional(&mut *conn)
            .await?;
        match maybe_row {
            Some(row) => Ok(Some(VoucherModel::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, item: VoucherModel) -> DefaultResult<(), AppError> {
        let sql_patt = "INSERT INTO `voucher_seckill`(`voucher_id`,`shop_id`,`title`,`stock`,\
                        `begin_time`,`end_time`) VALUES (?,?,?,?,?,?) ON DUPLICATE KEY UPDATE \
                        `shop_id`=VALUES(`shop_id`), `title`=VALUES(`title`), \
                        `stock`=VALUES(`stock`), `begin_time`=VALUES(`begin_time`), \
                        `end_time`=VALUES(`end_time`)";
        let mut conn = self._db.acquire().await?;
        let _resultset = sqlx::query(sql_patt)
            .bind(item.voucher_id)
            .bind(item.shop_id)
            .bind(item.title.as_str())
            .bind(item.stock)
            .bind(item.begin_time.with_timezone(&Utc))
            .bind(item.end_time.with_timezone(&Utc))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn decrement_stock(&self, voucher_id: u64) -> DefaultResult<bool, AppError> {
        // optimistic variant of the guarded decrement, the predicate keeps
        // the counter from ever crossing zero under concurrent commits
        let sql_patt =
            "UPDATE `voucher_seckill` SET `stock`=`stock`-1 WHERE `voucher_id`=? AND `stock` > 0";
        let mut conn = self._db.acquire().await?;
        let resultset = sqlx::query(sql_patt)
            .bind(voucher_id)
            .execute(&mut *conn)
            .await?;
        Ok(resultset.rows_affected() == 1)
    }
} // end of impl AbsVoucherRepo for VoucherMariaDbRepo
