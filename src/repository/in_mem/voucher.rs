use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;

use crate::datastore::{AbstInMemoryDStore, AppInMemFetchedSingleRow};
use crate::error::{AppError, AppErrorCode};
use crate::model::VoucherModel;

use super::super::AbsVoucherRepo;

mod _voucher {
    pub(super) const TABLE_LABEL: &str = "voucher_seckill";
    pub(super) enum InMemColIdx {
        ShopId,
        Title,
        Stock,
        BeginTime,
        EndTime,
        TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::ShopId => 0,
                InMemColIdx::Title => 1,
                InMemColIdx::Stock => 2,
                InMemColIdx::BeginTime => 3,
                InMemColIdx::EndTime => 4,
                InMemColIdx::TotNumColumns => 5,
            }
        }
    }
} // end of inner module _voucher

pub struct VoucherInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl VoucherInMemRepo {
    pub async fn build(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(_voucher::TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn to_row(item: &VoucherModel) -> AppInMemFetchedSingleRow {
        let mut row = (0.._voucher::InMemColIdx::TotNumColumns.into())
            .map(|_n| String::new())
            .collect::<Vec<String>>();
        let _ = [
            (_voucher::InMemColIdx::ShopId, item.shop_id.to_string()),
            (_voucher::InMemColIdx::Title, item.title.clone()),
            (_voucher::InMemColIdx::Stock, item.stock.to_string()),
            (
                _voucher::InMemColIdx::BeginTime,
                item.begin_time.to_rfc3339(),
            ),
            (_voucher::InMemColIdx::EndTime, item.end_time.to_rfc3339()),
        ]
        .into_iter()
        .map(|(idx, val)| {
            let idx: usize = idx.into();
            row[idx] = val;
        })
        .collect::<Vec<()>>();
        row
    }

    fn try_from_row(
        voucher_id: u64,
        row: &AppInMemFetchedSingleRow,
    ) -> DefaultResult<VoucherModel, AppError> {
        let _corrupt = |detail: String| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(detail),
        };
        let shop_id = row
            .get::<usize>(_voucher::InMemColIdx::ShopId.into())
            .ok_or_else(|| _corrupt("shop-id-missing".to_string()))?
            .parse::<u64>()
            .map_err(|e| _corrupt(format!("shop-id:{e}")))?;
        let title = row
            .get::<usize>(_voucher::InMemColIdx::Title.into())
            .ok_or_else(|| _corrupt("title-missing".to_string()))?
            .clone();
        let stock = row
            .get::<usize>(_voucher::InMemColIdx::Stock.into())
            .ok_or_else(|| _corrupt("stock-missing".to_string()))?
            .parse::<u32>()
            .map_err(|e| _corrupt(format!("stock:{e}")))?;
        let begin_time = row
            .get::<usize>(_voucher::InMemColIdx::BeginTime.into())
            .map(|s| DateTime::parse_from_rfc3339(s.as_str()))
            .ok_or_else(|| _corrupt("begin-time-missing".to_string()))?
            .map_err(|e| _corrupt(format!("begin-time:{e}")))?;
        let end_time = row
            .get::<usize>(_voucher::InMemColIdx::EndTime.into())
            .map(|s| DateTime::parse_from_rfc3339(s.as_str()))
            .ok_or_else(|| _corrupt("end-time-missing".to_string()))?
            .map_err(|e| _corrupt(format!("end-time:{e}")))?;
        Ok(VoucherModel {
            voucher_id,
            shop_id,
            title,
            stock,
            begin_time,
            end_time,
        })
    } // end of fn try_from_row
} // end of impl VoucherInMemRepo

#[async_trait]
impl AbsVoucherRepo for VoucherInMemRepo {
    async fn fetch(&self, voucher_id: u64) -> DefaultResult<Option<VoucherModel>, AppError> {
        let info = HashMap::from([(
            _voucher::TABLE_LABEL.to_string(),
            vec![voucher_id.to_string()],
        )]);
        let mut resultset = self.datastore.fetch(info).await?;
        let rows = resultset.remove(_voucher::TABLE_LABEL).unwrap();
        if let Some(row) = rows.get(voucher_id.to_string().as_str()) {
            let item = Self::try_from_row(voucher_id, row)?;
            Ok(Some(item))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, item: VoucherModel) -> DefaultResult<(), AppError> {
        let rows = HashMap::from([(item.voucher_id.to_string(), Self::to_row(&item))]);
        let data = HashMap::from([(_voucher::TABLE_LABEL.to_string(), rows)]);
        let _num_saved = self.datastore.save(data).await?;
        Ok(())
    }

    async fn decrement_stock(&self, voucher_id: u64) -> DefaultResult<bool, AppError> {
        let pkey = voucher_id.to_string();
        let info = HashMap::from([(_voucher::TABLE_LABEL.to_string(), vec![pkey.clone()])]);
        let (mut data, d_lock) = self.datastore.fetch_acquire(info).await?;
        let table = data.get_mut(_voucher::TABLE_LABEL).unwrap();
        let row = match table.get_mut(pkey.as_str()) {
            Some(r) => r,
            None => {
                return Err(AppError {
                    code: AppErrorCode::VoucherNotExist,
                    detail: Some(pkey),
                });
            } // the acquired guard is dropped on early return
        };
        let mut item = Self::try_from_row(voucher_id, row)?;
        if !item.try_deduct_one() {
            return Ok(false);
        }
        *row = Self::to_row(&item);
        let _num_saved = self.datastore.save_release(data, d_lock)?;
        Ok(true)
    } // end of fn decrement_stock
} // end of impl AbsVoucherRepo for VoucherInMemRepo
