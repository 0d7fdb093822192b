use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::constant::keyspace;
use crate::datastore::AbstSharedKValStore;
use crate::error::AppError;

/// mutual exclusion backed by the shared key-value store, usable across
/// process instances. Acquisition is one set-if-absent with TTL and fails
/// fast, callers decide their own wait policy. The TTL bounds how long a
/// crashed holder can block everyone else, there is no ownership renewal
/// so callers size it for the expected critical section.
#[async_trait]
pub trait AbstDistributedLock: Send + Sync {
    fn resource(&self) -> &str;
    async fn try_acquire(&self, ttl: Duration) -> DefaultResult<bool, AppError>;
    async fn release(&self) -> DefaultResult<bool, AppError>;
}

pub struct AppDistributedLock {
    kvstore: Arc<Box<dyn AbstSharedKValStore>>,
    resource: String,
    key: String,
    owner_token: String,
}

impl AppDistributedLock {
    pub fn new(kvstore: Arc<Box<dyn AbstSharedKValStore>>, resource: &str) -> Self {
        let key = format!("{}{}", keyspace::LOCK_PREFIX, resource);
        // token unique to this acquirer instance, a slow holder whose TTL
        // elapsed can no longer delete the key once someone else re-acquired
        let owner_token = Uuid::new_v4().to_string();
        Self {
            kvstore,
            resource: resource.to_string(),
            key,
            owner_token,
        }
    }
}

#[async_trait]
impl AbstDistributedLock for AppDistributedLock {
    fn resource(&self) -> &str {
        self.resource.as_str()
    }

    async fn try_acquire(&self, ttl: Duration) -> DefaultResult<bool, AppError> {
        self.kvstore
            .set_if_absent(self.key.as_str(), self.owner_token.clone(), ttl)
            .await
    }

    async fn release(&self) -> DefaultResult<bool, AppError> {
        // token comparison and deletion run as one scripted step at the
        // store, two separate round trips would race against TTL expiry
        // followed by another acquirer
        self.kvstore
            .run_compare_delete_script(self.key.as_str(), self.owner_token.as_str())
            .await
    }
} // end of impl AbstDistributedLock for AppDistributedLock
