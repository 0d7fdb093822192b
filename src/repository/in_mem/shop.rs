use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleRow,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::{ShopCategoryModel, ShopModel};

use super::super::AbsShopRepo;

mod _shop {
    pub(super) const TABLE_LABEL: &str = "shop_profile";
    pub(super) enum InMemColIdx {
        Name,
        Address,
        Score,
        TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::Name => 0,
                InMemColIdx::Address => 1,
                InMemColIdx::Score => 2,
                InMemColIdx::TotNumColumns => 3,
            }
        }
    }
}

mod _shop_category {
    pub(super) const TABLE_LABEL: &str = "shop_category";
    pub(super) enum InMemColIdx {
        Name,
        SortSeq,
        TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::Name => 0,
                InMemColIdx::SortSeq => 1,
                InMemColIdx::TotNumColumns => 2,
            }
        }
    }
}

struct AcceptAllFiltKeyOp;

impl AbsDStoreFilterKeyOp for AcceptAllFiltKeyOp {
    fn filter(&self, _k: &String, _v: &Vec<String>) -> bool {
        true
    }
}

pub struct ShopInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl ShopInMemRepo {
    pub async fn build(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(_shop::TABLE_LABEL).await?;
        m.create_table(_shop_category::TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn shop_to_row(item: &ShopModel) -> AppInMemFetchedSingleRow {
        let mut row = (0.._shop::InMemColIdx::TotNumColumns.into())
            .map(|_n| String::new())
            .collect::<Vec<String>>();
        let _ = [
            (_shop::InMemColIdx::Name, item.name.clone()),
            (_shop::InMemColIdx::Address, item.address.clone()),
            (_shop::InMemColIdx::Score, item.score.to_string()),
        ]
        .into_iter()
        .map(|(idx, val)| {
            let idx: usize = idx.into();
            row[idx] = val;
        })
        .collect::<Vec<()>>();
        row
    }

    fn shop_try_from_row(
        shop_id: u64,
        row: &AppInMemFetchedSingleRow,
    ) -> DefaultResult<ShopModel, AppError> {
        let _corrupt = |detail: String| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(detail),
        };
        let name = row
            .get::<usize>(_shop::InMemColIdx::Name.into())
            .ok_or_else(|| _corrupt("name-missing".to_string()))?
            .clone();
        let address = row
            .get::<usize>(_shop::InMemColIdx::Address.into())
            .ok_or_else(|| _corrupt("address-missing".to_string()))?
            .clone();
        let score = row
            .get::<usize>(_shop::InMemColIdx::Score.into())
            .ok_or_else(|| _corrupt("score-missing".to_string()))?
            .parse::<u32>()
            .map_err(|e| _corrupt(format!("score:{e}")))?;
        Ok(ShopModel {
            id: shop_id,
            name,
            address,
            score,
        })
    }

    fn category_try_from_row(
        id_serial: &str,
        row: &AppInMemFetchedSingleRow,
    ) -> DefaultResult<ShopCategoryModel, AppError> {
        let _corrupt = |detail: String| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(detail),
        };
        let id = id_serial
            .parse::<u64>()
            .map_err(|e| _corrupt(format!("category-id:{e}")))?;
        let name = row
            .get::<usize>(_shop_category::InMemColIdx::Name.into())
            .ok_or_else(|| _corrupt("name-missing".to_string()))?
            .clone();
        let sort_seq = row
            .get::<usize>(_shop_category::InMemColIdx::SortSeq.into())
            .ok_or_else(|| _corrupt("sort-seq-missing".to_string()))?
            .parse::<u16>()
            .map_err(|e| _corrupt(format!("sort-seq:{e}")))?;
        Ok(ShopCategoryModel { id, name, sort_seq })
    }
} // end of impl ShopInMemRepo

#[async_trait]
impl AbsShopRepo for ShopInMemRepo {
    async fn fetch(&self, shop_id: u64) -> DefaultResult<Option<ShopModel>, AppError> {
        let info = HashMap::from([(_shop::TABLE_LABEL.to_string(), vec![shop_id.to_string()])]);
        let mut resultset = self.datastore.fetch(info).await?;
        let rows = resultset.remove(_shop::TABLE_LABEL).unwrap();
        if let Some(row) = rows.get(shop_id.to_string().as_str()) {
            let item = Self::shop_try_from_row(shop_id, row)?;
            Ok(Some(item))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, item: ShopModel) -> DefaultResult<(), AppError> {
        let rows = HashMap::from([(item.id.to_string(), Self::shop_to_row(&item))]);
        let data = HashMap::from([(_shop::TABLE_LABEL.to_string(), rows)]);
        let _num_saved = self.datastore.save(data).await?;
        Ok(())
    }

    async fn fetch_categories(&self) -> DefaultResult<Vec<ShopCategoryModel>, AppError> {
        let op = AcceptAllFiltKeyOp;
        let keys = self
            .datastore
            .filter_keys(_shop_category::TABLE_LABEL.to_string(), &op)
            .await?;
        let info = HashMap::from([(_shop_category::TABLE_LABEL.to_string(), keys)]);
        let mut resultset = self.datastore.fetch(info).await?;
        let rows = resultset.remove(_shop_category::TABLE_LABEL).unwrap();
        let mut items = rows
            .iter()
            .map(|(id_serial, row)| Self::category_try_from_row(id_serial, row))
            .collect::<DefaultResult<Vec<ShopCategoryModel>, AppError>>()?;
        items.sort_by_key(|c| c.sort_seq);
        Ok(items)
    }

    async fn save_categories(&self, items: Vec<ShopCategoryModel>) -> DefaultResult<(), AppError> {
        let kv_pairs = items.into_iter().map(|c| {
            let mut row = (0.._shop_category::InMemColIdx::TotNumColumns.into())
                .map(|_n| String::new())
                .collect::<Vec<String>>();
            let name_idx: usize = _shop_category::InMemColIdx::Name.into();
            let seq_idx: usize = _shop_category::InMemColIdx::SortSeq.into();
            row[name_idx] = c.name;
            row[seq_idx] = c.sort_seq.to_string();
            (c.id.to_string(), row)
        });
        let data = HashMap::from([(
            _shop_category::TABLE_LABEL.to_string(),
            HashMap::from_iter(kv_pairs),
        )]);
        let _num_saved = self.datastore.save(data).await?;
        Ok(())
    }
} // end of impl AbsShopRepo for ShopInMemRepo
