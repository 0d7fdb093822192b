use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;

use crate::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleRow,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::VoucherOrderModel;

use super::super::AbsVoucherOrderRepo;

mod _vorder {
    pub(super) const TABLE_LABEL: &str = "voucher_order";
    pub(super) enum InMemColIdx {
        OrderId,
        CreateTime,
        TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::OrderId => 0,
                InMemColIdx::CreateTime => 1,
                InMemColIdx::TotNumColumns => 2,
            }
        }
    }
    // the row key is `usr-id/voucher-id`, the store rejecting a second row
    // with the same key is what caps each user at one order per voucher
    pub(super) fn pkey(usr_id: u32, voucher_id: u64) -> String {
        format!("{usr_id}/{voucher_id}")
    }
} // end of inner module _vorder

struct OrderIdFiltKeyOp {
    target: String,
}

impl AbsDStoreFilterKeyOp for OrderIdFiltKeyOp {
    fn filter(&self, _k: &String, v: &Vec<String>) -> bool {
        let idx: usize = _vorder::InMemColIdx::OrderId.into();
        v.get(idx).map(|s| s == &self.target).unwrap_or(false)
    }
}

pub struct VoucherOrderInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl VoucherOrderInMemRepo {
    pub async fn build(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(_vorder::TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn to_row(item: &VoucherOrderModel) -> AppInMemFetchedSingleRow {
        let mut row = (0.._vorder::InMemColIdx::TotNumColumns.into())
            .map(|_n| String::new())
            .collect::<Vec<String>>();
        let _ = [
            (_vorder::InMemColIdx::OrderId, item.order_id.to_string()),
            (
                _vorder::InMemColIdx::CreateTime,
                item.create_time.to_rfc3339(),
            ),
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
        pkey: &str,
        row: &AppInMemFetchedSingleRow,
    ) -> DefaultResult<VoucherOrderModel, AppError> {
        let _corrupt = |detail: String| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(detail),
        };
        let mut id_elms = pkey.split('/');
        let (usr_id, voucher_id) = match (id_elms.next(), id_elms.next()) {
            (Some(u), Some(v)) => (
                u.parse::<u32>()
                    .map_err(|e| _corrupt(format!("usr-id:{e}")))?,
                v.parse::<u64>()
                    .map_err(|e| _corrupt(format!("voucher-id:{e}")))?,
            ),
            _others => {
                return Err(_corrupt(format!("order-key:{pkey}")));
            }
        };
        let order_id = row
            .get::<usize>(_vorder::InMemColIdx::OrderId.into())
            .ok_or_else(|| _corrupt("order-id-missing".to_string()))?
            .parse::<u64>()
            .map_err(|e| _corrupt(format!("order-id:{e}")))?;
        let create_time = row
            .get::<usize>(_vorder::InMemColIdx::CreateTime.into())
            .map(|s| DateTime::parse_from_rfc3339(s.as_str()))
            .ok_or_else(|| _corrupt("create-time-missing".to_string()))?
            .map_err(|e| _corrupt(format!("create-time:{e}")))?;
        Ok(VoucherOrderModel {
            order_id,
            usr_id,
            voucher_id,
            create_time,
        })
    } // end of fn try_from_row
} // end of impl VoucherOrderInMemRepo

#[async_trait]
impl AbsVoucherOrderRepo for VoucherOrderInMemRepo {
    async fn create(&self, item: VoucherOrderModel) -> DefaultResult<(), AppError> {
        let pkey = _vorder::pkey(item.usr_id, item.voucher_id);
        let info = HashMap::from([(_vorder::TABLE_LABEL.to_string(), vec![pkey.clone()])]);
        // the uniqueness check and the insert hold the same store guard,
        // two tasks creating for the same user cannot interleave here
        let (mut data, d_lock) = self.datastore.fetch_acquire(info).await?;
        let table = data.get_mut(_vorder::TABLE_LABEL).unwrap();
        if table.contains_key(pkey.as_str()) {
            return Err(AppError {
                code: AppErrorCode::DuplicateRecord,
                detail: Some(pkey),
            });
        }
        table.insert(pkey, Self::to_row(&item));
        let _num_saved = self.datastore.save_release(data, d_lock)?;
        Ok(())
    }

    async fn num_orders_of_user(
        &self,
        usr_id: u32,
        voucher_id: u64,
    ) -> DefaultResult<usize, AppError> {
        let pkey = _vorder::pkey(usr_id, voucher_id);
        let info = HashMap::from([(_vorder::TABLE_LABEL.to_string(), vec![pkey.clone()])]);
        let mut resultset = self.datastore.fetch(info).await?;
        let rows = resultset.remove(_vorder::TABLE_LABEL).unwrap();
        Ok(rows.len())
    }

    async fn fetch_by_id(
        &self,
        order_id: u64,
    ) -> DefaultResult<Option<VoucherOrderModel>, AppError> {
        let op = OrderIdFiltKeyOp {
            target: order_id.to_string(),
        };
        let keys = self
            .datastore
            .filter_keys(_vorder::TABLE_LABEL.to_string(), &op)
            .await?;
        let pkey = match keys.into_iter().next() {
            Some(k) => k,
            None => {
                return Ok(None);
            }
        };
        let info = HashMap::from([(_vorder::TABLE_LABEL.to_string(), vec![pkey.clone()])]);
        let mut resultset = self.datastore.fetch(info).await?;
        let rows = resultset.remove(_vorder::TABLE_LABEL).unwrap();
        if let Some(row) = rows.get(pkey.as_str()) {
            let item = Self::try_from_row(pkey.as_str(), row)?;
            Ok(Some(item))
        } else {
            Ok(None)
        }
    } // end of fn fetch_by_id
} // end of impl AbsVoucherOrderRepo for VoucherOrderInMemRepo
