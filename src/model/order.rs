use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// durable order row, uniqueness on `(usr_id, voucher_id)` caps each user
/// at one order per voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherOrderModel {
    pub order_id: u64,
    pub usr_id: u32,
    pub voucher_id: u64,
    pub create_time: DateTime<FixedOffset>,
}

/// hand-off payload between the admission path and the persistence worker.
/// The worker runs outside any request scope, so the task carries the user
/// identity itself instead of relying on ambient request context.
#[derive(Debug, Clone)]
pub struct AppOrderTask {
    pub order_id: u64,
    pub usr_id: u32,
    pub voucher_id: u64,
}
