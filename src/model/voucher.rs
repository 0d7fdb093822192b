use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// flash-sale voucher, `stock` counts the remaining sellable units and is
/// only ever mutated through the guarded decrement paths, never assigned
/// from request input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherModel {
    pub voucher_id: u64,
    pub shop_id: u64,
    pub title: String,
    pub stock: u32,
    pub begin_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

impl VoucherModel {
    pub fn not_started(&self, t: &DateTime<FixedOffset>) -> bool {
        &self.begin_time > t
    }
    pub fn ended(&self, t: &DateTime<FixedOffset>) -> bool {
        &self.end_time < t
    }
    pub fn try_deduct_one(&mut self) -> bool {
        if self.stock > 0 {
            self.stock -= 1;
            true
        } else {
            false
        }
    }
}
