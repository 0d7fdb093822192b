use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::Row;

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::{ShopCategoryModel, ShopModel};

use super::super::AbsShopRepo;

pub(crate) struct ShopMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl TryFrom<MySqlRow> for ShopModel {
    type Error = AppError;
    fn try_from(row: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let id = row.try_get::<u64, usize>(0)?;
        let name = row.try_get::<String, usize>(1)?;
        let address = row.try_get::<String, usize>(2)?;
        let score = row.try_get::<u32, usize>(3)?;
        Ok(Self {
            id,
            name,
            address,
            score,
        })
    }
}

impl TryFrom<MySqlRow> for ShopCategoryModel {
    type Error = AppError;
    fn try_from(row: MySqlRow) -> DefaultResult<Self, Self::Error> {
        let id = row.try_get::<u64, usize>(0)?;
        let name = row.try_get::<String, usize>(1)?;
        let sort_seq = row.try_get::<u16, usize>(2)?;
        Ok(Self { id, name, sort_seq })
    }
}

impl ShopMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = dbs.first().cloned().ok_or(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("mariadb".to_string()),
        })?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsShopRepo for ShopMariaDbRepo {
    async fn fetch(&self, shop_id: u64) -> DefaultResult<Option<ShopModel>, AppError> {
        let sql_patt =
            "SELECT `id`,`name`,`address`,`score` FROM `shop_profile` WHERE `id`=?";
        let mut conn = self._db.acquire().await?;
        let maybe_row = sqlx::query(sql_patt)
            .bind(shop_id)
            .fetch_optional(&mut *conn)
            .await?;
        match maybe_row {
            Some(row) => Ok(Some(ShopModel::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, item: ShopModel) -> DefaultResult<(), AppError> {
        let sql_patt = "INSERT INTO `shop_profile`(`id`,`name`,`address`,`score`) VALUES \
                        (?,?,?,?) ON DUPLICATE KEY UPDATE `name`=VALUES(`name`), \
                        `address`=VALUES(`address`), `score`=VALUES(`score`)";
        let mut conn = self._db.acquire().await?;
        let _resultset = sqlx::query(sql_patt)
            .bind(item.id)
            .bind(item.name.as_str())
            .bind(item.address.as_str())
            .bind(item.score)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn fetch_categories(&self) -> DefaultResult<Vec<ShopCategoryModel>, AppError> {
        let sql_patt =
            "SELECT `id`,`name`,`sort_seq` FROM `shop_category` ORDER BY `sort_seq` ASC";
        let mut conn = self._db.acquire().await?;
        let rows = sqlx::query(sql_patt).fetch_all(&mut *conn).await?;
        rows.into_iter()
            .map(ShopCategoryModel::try_from)
            .collect::<DefaultResult<Vec<ShopCategoryModel>, AppError>>()
    }

    async fn save_categories(&self, items: Vec<ShopCategoryModel>) -> DefaultResult<(), AppError> {
        let sql_patt = "INSERT INTO `shop_category`(`id`,`name`,`sort_seq`) VALUES (?,?,?) ON \
                        DUPLICATE KEY UPDATE `name`=VALUES(`name`), `sort_seq`=VALUES(`sort_seq`)";
        let mut conn = self._db.acquire().await?;
        for item in items.into_iter() {
            let _resultset = sqlx::query(sql_patt)
                .bind(item.id)
                .bind(item.name.as_str())
                .bind(item.sort_seq)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
} // end of impl AbsShopRepo for ShopMariaDbRepo
