use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::Duration;

use crate::constant::keyspace;
use crate::error::{AppError, AppErrorCode};
use crate::model::{ShopCategoryModel, ShopModel};
use crate::repository::AbsShopRepo;
use crate::AppSharedState;

/// shop / category read paths, the production consumers of the cache
/// engine. Write traffic for these records lives in another service, this
/// side only loads on cache miss and pre-warms hot entries.
pub struct ShopQueryUseCase {
    pub glb_state: AppSharedState,
    pub repo: Arc<Box<dyn AbsShopRepo>>,
}

impl ShopQueryUseCase {
    fn entry_ttl(&self) -> Duration {
        let secs = self.glb_state.config().service.cache.entry_ttl_secs;
        Duration::seconds(secs as i64)
    }

    /// cache-aside read, repeated lookups of a shop ID which never existed
    /// stop at the cached empty sentinel instead of hammering the
    /// backing repository
    pub async fn shop_by_id_null_guarded(
        &self,
        shop_id: u64,
    ) -> DefaultResult<Option<ShopModel>, AppError> {
        let cache = self.glb_state.cache_client();
        let key = format!("{}{}", keyspace::CACHE_SHOP_PREFIX, shop_id);
        let repo = self.repo.clone();
        cache
            .query_with_null_guard(key, self.entry_ttl(), move || async move {
                repo.fetch(shop_id).await
            })
            .await
    }

    /// read path for pre-warmed hot shops, a stale entry is served
    /// immediately while one background task refreshes it
    pub async fn shop_by_id_always_available(
        &self,
        shop_id: u64,
        valid_for: Duration,
    ) -> DefaultResult<Option<ShopModel>, AppError> {
        let cache = self.glb_state.cache_client();
        let key = format!("{}{}", keyspace::CACHE_SHOP_PREFIX, shop_id);
        let repo = self.repo.clone();
        cache
            .query_with_logical_expiry(key, valid_for, move || async move {
                repo.fetch(shop_id).await
            })
            .await
    }

    /// seed the always-available entry before the sale window opens
    pub async fn prewarm_shop(
        &self,
        shop_id: u64,
        valid_for: Duration,
    ) -> DefaultResult<(), AppError> {
        let item = match self.repo.fetch(shop_id).await? {
            Some(v) => v,
            None => {
                return Err(AppError {
                    code: AppErrorCode::ShopNotExist,
                    detail: Some(shop_id.to_string()),
                });
            }
        };
        let cache = self.glb_state.cache_client();
        let key = format!("{}{}", keyspace::CACHE_SHOP_PREFIX, shop_id);
        cache
            .set_with_logical_expiry(key.as_str(), &item, valid_for)
            .await
    }

    pub async fn categories_all(&self) -> DefaultResult<Vec<ShopCategoryModel>, AppError> {
        let cache = self.glb_state.cache_client();
        let key = keyspace::CACHE_SHOP_CATEGORY_KEY.to_string();
        let repo = self.repo.clone();
        let result = cache
            .query_with_null_guard(key, self.entry_ttl(), move || async move {
                let items = repo.fetch_categories().await?;
                if items.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(items))
                }
            })
            .await?;
        Ok(result.unwrap_or_default())
    }
} // end of impl ShopQueryUseCase
