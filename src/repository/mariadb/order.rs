use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::VoucherOrderModel;

use super::super::AbsVoucherOrderRepo;

pub(crate) struct VoucherOrderMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl TryFrom<MySqlRow> for VoucherOrderModel {
    type Error = AppError;
    fn try_from(row: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let order_id = row.try_get::<u64, usize>(0)?;
        let usr_id = row.try_get::<u32, usize>(1)?;
        let voucher_id = row.try_get::<u64, usize>(2)?;
        let create_time = row.try_get::<DateTime<Utc>, usize>(3)?.fixed_offset();
        Ok(Self {
            order_id,
            usr_id,
            voucher_id,
            create_time,
        })
    }
}

impl VoucherOrderMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = dbs.first().cloned().ok_or(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("mariadb".to_string()),
        })?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsVoucherOrderRepo for VoucherOrderMariaDbRepo {
    async fn create(&self, item: VoucherOrderModel) -> DefaultResult<(), AppError> {
        // the unique index on (usr_id, voucher_id) makes a second insert
        // for the same pair fail even if this task ran twice
        let sql_patt = "INSERT INTO `voucher_order`(`order_id`,`usr_id`,`voucher_id`,\
                        `create_time`) VALUES (?,?,?,?)";
        let mut conn = self._db.acquire().await?;
        let result = sqlx::query(sql_patt)
            .bind(item.order_id)
            .bind(item.usr_id)
            .bind(item.voucher_id)
            .bind(item.create_time.with_timezone(&Utc))
            .execute(&mut *conn)
            .await;
        match result {
            Ok(_resultset) => Ok(()),
            Err(sqlx::Error::Database(de)) => {
                if de.is_unique_violation() {
                    let detail = format!("{}/{}", item.usr_id, item.voucher_id);
                    Err(AppError {
                        code: AppErrorCode::DuplicateRecord,
                        detail: Some(detail),
                    })
                } else {
                    Err(sqlx::Error::Database(de).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    } // end of fn create

    async fn num_orders_of_user(
        &self,
        usr_id: u32,
        voucher_id: u64,
    ) -> DefaultResult<usize, AppError> {
        let sql_patt =
            "SELECT COUNT(*) FROM `voucher_order` WHERE `usr_id`=? AND `voucher_id`=?";
        let mut conn = self._db.acquire().await?;
        let row = sqlx::query(sql_patt)
            .bind(usr_id)
            .bind(voucher_id)
            .fetch_one(&mut *conn)
            .await?;
        let num = row.try_get::<i64, usize>(0)?;
        Ok(num as usize)
    }

    async fn fetch_by_id(
        &self,
        order_id: u64,
    ) -> DefaultResult<Option<VoucherOrderModel>, AppError> {
        let sql_patt = "SELECT `order_id`,`usr_id`,`voucher_id`,`create_time` FROM \
                        `voucher_order` WHERE `order_id`=?";
        let mut conn = self._db.acquire().await?;
        let maybe_row = sqlx::query(sql_patt)
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?;
        match maybe_row {
            Some(row) => Ok(Some(VoucherOrderModel::try_from(row)?)),
            None => Ok(None),
        }
    }
} // end of impl AbsVoucherOrderRepo for VoucherOrderMariaDbRepo
