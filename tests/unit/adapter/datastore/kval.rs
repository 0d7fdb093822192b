use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;

use voucher::datastore::{reserve_script_code, AbstSharedKValStore, AppSharedKValStore};
use voucher::error::AppErrorCode;
use voucher::AppInMemoryDbCfg;

fn ut_setup_kvstore(max_items: u32) -> Arc<AppSharedKValStore> {
    let cfg = AppInMemoryDbCfg {
        alias: "flashsale-kv".to_string(),
        max_items,
    };
    Arc::new(AppSharedKValStore::new(&cfg))
}

#[tokio::test]
async fn text_set_get_ok() {
    let kvstore = ut_setup_kvstore(16);
    let result = kvstore.get("cache:shop:901").await;
    assert_eq!(result.unwrap(), None);
    let result = kvstore
        .set("cache:shop:901", "tea-house".to_string(), None)
        .await;
    assert!(result.is_ok());
    let result = kvstore.get("cache:shop:901").await;
    assert_eq!(result.unwrap(), Some("tea-house".to_string()));
    let result = kvstore.delete(vec!["cache:shop:901".to_string()]).await;
    assert_eq!(result.unwrap(), 1);
    let result = kvstore.get("cache:shop:901").await;
    assert_eq!(result.unwrap(), None);
}

#[tokio::test]
async fn text_entry_expiry_ok() {
    let kvstore = ut_setup_kvstore(16);
    let result = kvstore
        .set(
            "cache:shop:902",
            "ramen-ya".to_string(),
            Some(Duration::milliseconds(60)),
        )
        .await;
    assert!(result.is_ok());
    let result = kvstore.get("cache:shop:902").await;
    assert_eq!(result.unwrap(), Some("ramen-ya".to_string()));
    tokio::time::sleep(std::time::Duration::from_millis(90)).await;
    let result = kvstore.get("cache:shop:902").await;
    assert_eq!(result.unwrap(), None); // expired entry behaves like absent
}

#[tokio::test]
async fn set_if_absent_ok() {
    let kvstore = ut_setup_kvstore(16);
    let ttl = Duration::milliseconds(80);
    let result = kvstore
        .set_if_absent("lock:order-user:188", "token-a".to_string(), ttl)
        .await;
    assert_eq!(result.unwrap(), true);
    let result = kvstore
        .set_if_absent("lock:order-user:188", "token-b".to_string(), ttl)
        .await;
    assert_eq!(result.unwrap(), false);
    // holder value must stay untouched after the failed attempt
    let result = kvstore.get("lock:order-user:188").await;
    assert_eq!(result.unwrap(), Some("token-a".to_string()));
    tokio::time::sleep(std::time::Duration::from_millis(110)).await;
    let result = kvstore
        .set_if_absent("lock:order-user:188", "token-b".to_string(), ttl)
        .await;
    assert_eq!(result.unwrap(), true);
}

#[tokio::test]
async fn incr_sequence_ok() {
    let kvstore = ut_setup_kvstore(16);
    for expect in 1i64..=5 {
        let result = kvstore.incr("incr:order:20230929").await;
        assert_eq!(result.unwrap(), expect);
    }
    let result = kvstore.incr("incr:order:20230930").await;
    assert_eq!(result.unwrap(), 1); // another day, another counter
}

#[tokio::test]
async fn incr_type_mismatch_error() {
    let kvstore = ut_setup_kvstore(16);
    let result = kvstore
        .hash_set_fields("session:xyz", vec![("nickname".to_string(), "ks".to_string())])
        .await;
    assert!(result.is_ok());
    let result = kvstore.incr("session:xyz").await;
    assert_eq!(result.err().unwrap().code, AppErrorCode::DataCorruption);
}

#[tokio::test]
async fn hash_fields_ok() {
    let kvstore = ut_setup_kvstore(16);
    let fields = vec![
        ("nickname".to_string(), "d9wu0".to_string()),
        ("icon".to_string(), "/path/to/icon".to_string()),
    ];
    let result = kvstore.hash_set_fields("session:tok1234", fields).await;
    assert!(result.is_ok());
    let more_fields = vec![("nickname".to_string(), "laundry-hero".to_string())];
    let result = kvstore.hash_set_fields("session:tok1234", more_fields).await;
    assert!(result.is_ok());
    let result = kvstore.hash_get_all("session:tok1234").await;
    let actual = result.unwrap();
    assert_eq!(actual.len(), 2);
    assert_eq!(actual.get("nickname").unwrap(), "laundry-hero");
    assert_eq!(actual.get("icon").unwrap(), "/path/to/icon");
    let result = kvstore.hash_get_all("session:no-such-token").await;
    assert!(result.unwrap().is_empty());
}

#[tokio::test]
async fn zset_rank_ok() {
    let kvstore = ut_setup_kvstore(16);
    let samples = [("blog-88", 3.0f64), ("blog-17", 1.0), ("blog-29", 2.0)];
    for (member, score) in samples {
        let result = kvstore.zset_add("blog:liked:ranking", member, score).await;
        assert!(result.is_ok());
    }
    let result = kvstore.zset_score("blog:liked:ranking", "blog-29").await;
    assert_eq!(result.unwrap(), Some(2.0));
    let result = kvstore.zset_score("blog:liked:ranking", "blog-404").await;
    assert_eq!(result.unwrap(), None);
    let result = kvstore.zset_range_by_rank("blog:liked:ranking", 0, 2).await;
    assert_eq!(result.unwrap(), vec!["blog-17".to_string(), "blog-29".to_string()]);
    // update score of existing member, the rank moves accordingly
    let result = kvstore.zset_add("blog:liked:ranking", "blog-17", 9.5).await;
    assert!(result.is_ok());
    let result = kvstore.zset_range_by_rank("blog:liked:ranking", 0, 3).await;
    assert_eq!(
        result.unwrap(),
        vec!["blog-29".to_string(), "blog-88".to_string(), "blog-17".to_string()]
    );
}

#[tokio::test]
async fn compare_delete_script_ok() {
    let kvstore = ut_setup_kvstore(16);
    let ttl = Duration::seconds(5);
    let result = kvstore
        .set_if_absent("lock:voucher:55", "owner-one".to_string(), ttl)
        .await;
    assert_eq!(result.unwrap(), true);
    let result = kvstore
        .run_compare_delete_script("lock:voucher:55", "owner-two")
        .await;
    assert_eq!(result.unwrap(), false); // mismatched token deletes nothing
    let result = kvstore.get("lock:voucher:55").await;
    assert_eq!(result.unwrap(), Some("owner-one".to_string()));
    let result = kvstore
        .run_compare_delete_script("lock:voucher:55", "owner-one")
        .await;
    assert_eq!(result.unwrap(), true);
    let result = kvstore.get("lock:voucher:55").await;
    assert_eq!(result.unwrap(), None);
}

#[tokio::test]
async fn reserve_script_tri_state_ok() {
    let kvstore = ut_setup_kvstore(16);
    let (stock_key, buyers_key) = ("seckill:stock:31", "seckill:buyers:31");
    let result = kvstore.set(stock_key, "1".to_string(), None).await;
    assert!(result.is_ok());
    let result = kvstore.run_reserve_script(stock_key, buyers_key, "1001").await;
    assert_eq!(result.unwrap(), reserve_script_code::RESERVED);
    // same member again, even though stock already hit zero the duplicate
    // answer is out-of-stock by script evaluation order
    let result = kvstore.run_reserve_script(stock_key, buyers_key, "1002").await;
    assert_eq!(result.unwrap(), reserve_script_code::OUT_OF_STOCK);
    let result = kvstore.get(stock_key).await;
    assert_eq!(result.unwrap(), Some("0".to_string()));
}

#[tokio::test]
async fn reserve_script_duplicate_member() {
    let kvstore = ut_setup_kvstore(16);
    let (stock_key, buyers_key) = ("seckill:stock:32", "seckill:buyers:32");
    let result = kvstore.set(stock_key, "4".to_string(), None).await;
    assert!(result.is_ok());
    let result = kvstore.run_reserve_script(stock_key, buyers_key, "1001").await;
    assert_eq!(result.unwrap(), reserve_script_code::RESERVED);
    let result = kvstore.run_reserve_script(stock_key, buyers_key, "1001").await;
    assert_eq!(result.unwrap(), reserve_script_code::DUPLICATE_MEMBER);
    // the duplicate attempt must not burn stock
    let result = kvstore.get(stock_key).await;
    assert_eq!(result.unwrap(), Some("3".to_string()));
}

#[tokio::test]
async fn reserve_script_without_preload() {
    let kvstore = ut_setup_kvstore(16);
    let result = kvstore
        .run_reserve_script("seckill:stock:404", "seckill:buyers:404", "1001")
        .await;
    assert_eq!(result.unwrap(), reserve_script_code::OUT_OF_STOCK);
}

#[tokio::test]
async fn reserve_script_concurrent_overdraw_never() {
    let kvstore = ut_setup_kvstore(64);
    let (stock_key, _buyers_key) = ("seckill:stock:33", "seckill:buyers:33");
    let init_stock = 4usize;
    let num_users = 11usize;
    let result = kvstore.set(stock_key, init_stock.to_string(), None).await;
    assert!(result.is_ok());
    let mut handles = Vec::new();
    for idx in 0..num_users {
        let kvstore_p = kvstore.clone();
        let handle = tokio::spawn(async move {
            let member = format!("{}", 5000 + idx);
            kvstore_p
                .run_reserve_script("seckill:stock:33", "seckill:buyers:33", member.as_str())
                .await
                .unwrap()
        });
        handles.push(handle);
    }
    let mut num_reserved = 0usize;
    let mut num_rejected = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            reserve_script_code::RESERVED => {
                num_reserved += 1;
            }
            reserve_script_code::OUT_OF_STOCK => {
                num_rejected += 1;
            }
            _others => {
                unreachable!();
            }
        }
    }
    assert_eq!(num_reserved, init_stock);
    assert_eq!(num_rejected, num_users - init_stock);
    let result = kvstore.get(stock_key).await;
    assert_eq!(result.unwrap(), Some("0".to_string()));
} // end of reserve_script_concurrent_overdraw_never

#[tokio::test]
async fn reserve_script_concurrent_same_member() {
    let kvstore = ut_setup_kvstore(64);
    let (stock_key, _buyers_key) = ("seckill:stock:34", "seckill:buyers:34");
    let result = kvstore.set(stock_key, "10".to_string(), None).await;
    assert!(result.is_ok());
    let mut handles = Vec::new();
    for _ in 0..6 {
        let kvstore_p = kvstore.clone();
        let handle = tokio::spawn(async move {
            kvstore_p
                .run_reserve_script("seckill:stock:34", "seckill:buyers:34", "7788")
                .await
                .unwrap()
        });
        handles.push(handle);
    }
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    let num_reserved = outcomes
        .iter()
        .filter(|c| **c == reserve_script_code::RESERVED)
        .count();
    let distinct = outcomes.iter().collect::<HashSet<_>>();
    assert_eq!(num_reserved, 1); // one user never holds two reservations
    assert!(distinct.contains(&reserve_script_code::DUPLICATE_MEMBER));
    let result = kvstore.get(stock_key).await;
    assert_eq!(result.unwrap(), Some("9".to_string()));
}
