use std::boxed::Box;

use voucher::error::AppErrorCode;
use voucher::repository::app_repo_voucher;

use super::super::ut_setup_voucher;
use crate::{ut_setup_share_state, MockConfidential};

#[tokio::test]
async fn save_fetch_ok() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let repo = app_repo_voucher(glb_state.datastore()).await.unwrap();
    let expect = ut_setup_voucher(810, 25);
    let result = repo.save(expect.clone()).await;
    assert!(result.is_ok());
    let result = repo.fetch(810).await;
    let actual = result.unwrap().unwrap();
    assert_eq!(actual.voucher_id, expect.voucher_id);
    assert_eq!(actual.shop_id, expect.shop_id);
    assert_eq!(actual.title, expect.title);
    assert_eq!(actual.stock, expect.stock);
    assert_eq!(actual.begin_time, expect.begin_time);
    assert_eq!(actual.end_time, expect.end_time);
    let result = repo.fetch(811).await;
    assert!(result.unwrap().is_none());
}

#[tokio::test]
async fn decrement_stock_guarded_floor() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let repo = app_repo_voucher(glb_state.datastore()).await.unwrap();
    let result = repo.save(ut_setup_voucher(812, 2)).await;
    assert!(result.is_ok());
    assert_eq!(repo.decrement_stock(812).await.unwrap(), true);
    assert_eq!(repo.decrement_stock(812).await.unwrap(), true);
    // guarded update refuses to cross zero
    assert_eq!(repo.decrement_stock(812).await.unwrap(), false);
    let actual = repo.fetch(812).await.unwrap().unwrap();
    assert_eq!(actual.stock, 0);
}

#[tokio::test]
async fn decrement_stock_nonexist() {
    let glb_state = ut_setup_share_state("config_ok.json", Box::new(MockConfidential {}));
    let repo = app_repo_voucher(glb_state.datastore()).await.unwrap();
    let result = repo.decrement_stock(9999).await;
    assert_eq!(result.err().unwrap().code, AppErrorCode::VoucherNotExist);
}
