use std::boxed::Box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use voucher::error::AppErrorCode;

use super::{ut_setup_share_state, MockConfidential};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UtCachedRecord {
    label: String,
    quantity: u32,
}

fn ut_sample_record(label: &str) -> UtCachedRecord {
    UtCachedRecord {
        label: label.to_string(),
        quantity: 41,
    }
}

#[tokio::test]
async fn null_guard_miss_then_hit() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cache = glb_state.cache_client();
    let num_loads = Arc::new(AtomicUsize::new(0));
    let ttl = Duration::seconds(60);
    for _ in 0..2 {
        let num_loads_p = num_loads.clone();
        let result = cache
            .query_with_null_guard::<UtCachedRecord, _, _>(
                "cache:shop:301".to_string(),
                ttl,
                move || async move {
                    num_loads_p.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(ut_sample_record("mi-casa")))
                },
            )
            .await;
        let actual = result.unwrap().unwrap();
        assert_eq!(actual, ut_sample_record("mi-casa"));
    }
    // second read was served from the cache, the loader ran exactly once
    assert_eq!(num_loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn null_guard_absorbs_nonexistent_key() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cache = glb_state.cache_client();
    let num_loads = Arc::new(AtomicUsize::new(0));
    let ttl = Duration::seconds(60);
    for _ in 0..3 {
        let num_loads_p = num_loads.clone();
        let result = cache
            .query_with_null_guard::<UtCachedRecord, _, _>(
                "cache:shop:404".to_string(),
                ttl,
                move || async move {
                    num_loads_p.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                },
            )
            .await;
        assert!(result.unwrap().is_none());
    }
    // the empty sentinel absorbed the repeated lookups
    assert_eq!(num_loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn corrupted_payload_is_error() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cache = glb_state.cache_client();
    let kvstore = glb_state.shared_kval_store();
    let result = kvstore
        .set("cache:shop:302", "{not-a-json".to_string(), None)
        .await;
    assert!(result.is_ok());
    let result = cache
        .query_with_null_guard::<UtCachedRecord, _, _>(
            "cache:shop:302".to_string(),
            Duration::seconds(60),
            move || async move { Ok(Some(ut_sample_record("unused"))) },
        )
        .await;
    assert_eq!(result.err().unwrap().code, AppErrorCode::DataCorruption);
}

#[tokio::test]
async fn logical_expiry_absent_key_no_mutation() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cache = glb_state.cache_client();
    let num_loads = Arc::new(AtomicUsize::new(0));
    let num_loads_p = num_loads.clone();
    let result = cache
        .query_with_logical_expiry::<UtCachedRecord, _, _>(
            "cache:shop:303".to_string(),
            Duration::seconds(60),
            move || async move {
                num_loads_p.fetch_add(1, Ordering::SeqCst);
                Ok(Some(ut_sample_record("unused")))
            },
        )
        .await;
    assert!(result.unwrap().is_none());
    assert_eq!(num_loads.load(Ordering::SeqCst), 0);
    // this mode assumes pre-warmed entries, a miss never writes back
    let kvstore = glb_state.shared_kval_store();
    let result = kvstore.get("cache:shop:303").await;
    assert!(result.unwrap().is_none());
}

#[tokio::test]
async fn logical_expiry_fresh_entry_no_rebuild() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cache = glb_state.cache_client();
    let result = cache
        .set_with_logical_expiry(
            "cache:shop:304",
            &ut_sample_record("herb-garden"),
            Duration::seconds(60),
        )
        .await;
    assert!(result.is_ok());
    let num_loads = Arc::new(AtomicUsize::new(0));
    let num_loads_p = num_loads.clone();
    let result = cache
        .query_with_logical_expiry::<UtCachedRecord, _, _>(
            "cache:shop:304".to_string(),
            Duration::seconds(60),
            move || async move {
                num_loads_p.fetch_add(1, Ordering::SeqCst);
                Ok(Some(ut_sample_record("newer")))
            },
        )
        .await;
    assert_eq!(result.unwrap().unwrap(), ut_sample_record("herb-garden"));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(num_loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn logical_expiry_stale_rebuilds_once() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let cache = glb_state.cache_client();
    // warm the entry with an expiry which already elapsed
    let result = cache
        .set_with_logical_expiry(
            "cache:shop:305",
            &ut_sample_record("stale-flavor"),
            Duration::seconds(-5),
        )
        .await;
    assert!(result.is_ok());
    let num_loads = Arc::new(AtomicUsize::new(0));
    let num_readers = 6usize;
    let mut handles = Vec::new();
    for _ in 0..num_readers {
        let cache_p = cache.clone();
        let num_loads_p = num_loads.clone();
        let handle = tokio::spawn(async move {
            cache_p
                .query_with_logical_expiry::<UtCachedRecord, _, _>(
                    "cache:shop:305".to_string(),
                    Duration::seconds(60),
                    move || async move {
                        // slow backend, readers must not wait for this
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        num_loads_p.fetch_add(1, Ordering::SeqCst);
                        Ok(Some(ut_sample_record("rebuilt-flavor")))
                    },
                )
                .await
                .unwrap()
        });
        handles.push(handle);
    }
    for handle in handles {
        // every reader gets an answer right away, the stale one
        let actual = handle.await.unwrap().unwrap();
        assert_eq!(actual, ut_sample_record("stale-flavor"));
    }
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    assert_eq!(num_loads.load(Ordering::SeqCst), 1);
    // the single background rebuild refreshed the entry
    let result = cache
        .query_with_logical_expiry::<UtCachedRecord, _, _>(
            "cache:shop:305".to_string(),
            Duration::seconds(60),
            move || async move { Ok(Some(ut_sample_record("unused"))) },
        )
        .await;
    assert_eq!(result.unwrap().unwrap(), ut_sample_record("rebuilt-flavor"));
    assert_eq!(num_loads.load(Ordering::SeqCst), 1);
} // end of logical_expiry_stale_rebuilds_once
