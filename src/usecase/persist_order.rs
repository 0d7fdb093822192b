use std::boxed::Box;
use std::result::Result as DefaultResult;

use chrono::{Duration, Local as LocalTime};

use crate::constant::keyspace;
use crate::error::{AppError, AppErrorCode};
use crate::lock::{AbstDistributedLock, AppDistributedLock};
use crate::logging::{app_log_event, AppLogLevel};
use crate::model::{AppOrderTask, VoucherOrderModel};
use crate::repository::{
    app_repo_voucher, app_repo_voucher_order, AbsVoucherOrderRepo, AbsVoucherRepo,
};
use crate::usecase::AppOrderTaskReceiver;
use crate::AppSharedState;

/// single consumer draining the reservation queue into the durable store.
/// A task that fails in here is logged and discarded, the accepted
/// reservation is NOT re-queued, operators have to reconcile from the log
/// stream. The unique `(usr_id, voucher_id)` row constraint still stops a
/// task processed twice from producing two orders.
pub struct OrderPersistWorker {
    glb_state: AppSharedState,
    repo_voucher: Box<dyn AbsVoucherRepo>,
    repo_order: Box<dyn AbsVoucherOrderRepo>,
    usr_lock_ttl: Duration,
}

impl OrderPersistWorker {
    pub async fn build(glb_state: AppSharedState) -> DefaultResult<Self, AppError> {
        let ds = glb_state.datastore();
        let repo_voucher = app_repo_voucher(ds.clone()).await?;
        let repo_order = app_repo_voucher_order(ds).await?;
        let ttl_secs = glb_state.config().service.seckill.user_lock_ttl_secs;
        Ok(Self {
            glb_state,
            repo_voucher,
            repo_order,
            usr_lock_ttl: Duration::seconds(ttl_secs as i64),
        })
    }

    /// park on the queue until the producer side is gone, each received
    /// task is committed at most once
    pub async fn run(self, mut receiver: AppOrderTaskReceiver) {
        let logctx_p = self.glb_state.log_context().clone();
        while let Some(task) = receiver.recv().await {
            self.process(task).await;
        }
        app_log_event!(logctx_p, AppLogLevel::INFO, "order-task queue closed");
    }

    async fn process(&self, task: AppOrderTask) {
        let logctx_p = self.glb_state.log_context().clone();
        let resource = format!("{}{}", keyspace::LOCK_ORDER_USER_PREFIX, task.usr_id);
        let usr_lock = AppDistributedLock::new(self.glb_state.shared_kval_store(), &resource);
        match usr_lock.try_acquire(self.usr_lock_ttl).await {
            Ok(true) => {}
            Ok(false) => {
                // another instance is persisting for the same user, drop
                app_log_event!(
                    logctx_p,
                    AppLogLevel::WARNING,
                    "user busy, task dropped, order-id:{}, usr:{}",
                    task.order_id,
                    task.usr_id
                );
                return;
            }
            Err(e) => {
                app_log_event!(
                    logctx_p,
                    AppLogLevel::ERROR,
                    "lock, task dropped, order-id:{}, {}",
                    task.order_id,
                    e
                );
                return;
            }
        }
        if let Err(e) = self.commit(&task).await {
            app_log_event!(
                logctx_p,
                AppLogLevel::ERROR,
                "task dropped, order-id:{}, usr:{}, voucher:{}, {}",
                task.order_id,
                task.usr_id,
                task.voucher_id,
                e
            );
        }
        // the unlock covers every exit path of the commit above
        if let Err(e) = usr_lock.release().await {
            app_log_event!(
                logctx_p,
                AppLogLevel::ERROR,
                "unlock, usr:{}, {}",
                task.usr_id,
                e
            );
        }
    } // end of fn process

    async fn commit(&self, task: &AppOrderTask) -> DefaultResult<(), AppError> {
        // defense in depth, the shared-store script already rejected
        // duplicates, re-check against what was durably persisted
        let num_prior = self
            .repo_order
            .num_orders_of_user(task.usr_id, task.voucher_id)
            .await?;
        if num_prior > 0 {
            return Err(AppError {
                code: AppErrorCode::DuplicateRecord,
                detail: Some(format!("{}/{}", task.usr_id, task.voucher_id)),
            });
        }
        let decremented = self.repo_voucher.decrement_stock(task.voucher_id).await?;
        if !decremented {
            return Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(format!("durable-stock-exhausted:{}", task.voucher_id)),
            });
        }
        let item = VoucherOrderModel {
            order_id: task.order_id,
            usr_id: task.usr_id,
            voucher_id: task.voucher_id,
            create_time: LocalTime::now().fixed_offset(),
        };
        self.repo_order.create(item).await
    } // end of fn commit
} // end of impl OrderPersistWorker
