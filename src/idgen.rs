use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::Utc;

use crate::constant::{app_meta, keyspace};
use crate::datastore::AbstSharedKValStore;
use crate::error::{AppError, AppErrorCode};

const TIMESTAMP_NBITS: u8 = 32;

/// time-ordered 64-bit ID, high half is seconds since the fixed epoch,
/// low half is an atomic counter in the shared store. The counter key is
/// bound to the calendar day so the sequence stays far below 32 bits even
/// at very high throughput, and the keyspace rotates instead of growing.
pub struct AppIdGenerator {
    kvstore: Arc<Box<dyn AbstSharedKValStore>>,
}

impl AppIdGenerator {
    pub fn new(kvstore: Arc<Box<dyn AbstSharedKValStore>>) -> Self {
        Self { kvstore }
    }

    pub async fn next_id(&self, biz_prefix: &str) -> DefaultResult<u64, AppError> {
        let timenow = Utc::now();
        let elapsed_secs = timenow.timestamp() - app_meta::ID_EPOCH_SECS;
        if elapsed_secs < 0 {
            return Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(format!("system-clock-before-epoch:{}", timenow)),
            });
        }
        let date_frag = timenow.format("%Y%m%d").to_string();
        let counter_key = format!(
            "{}{}:{}",
            keyspace::DAILY_COUNTER_PREFIX,
            biz_prefix,
            date_frag
        );
        let sequence = self.kvstore.incr(counter_key.as_str()).await?;
        let out = ((elapsed_secs as u64) << TIMESTAMP_NBITS) | (sequence as u64 & u32::MAX as u64);
        Ok(out)
    } // end of fn next_id
}
