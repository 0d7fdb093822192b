use std::boxed::Box;
use std::result::Result as DefaultResult;

use chrono::Local as LocalTime;
use tokio::sync::mpsc;

use crate::config::{AppQueueOverflowPolicy, AppSeckillCfg};
use crate::constant::app_meta;
use crate::error::{AppError, AppErrorCode};
use crate::logging::{app_log_event, AppLogLevel};
use crate::model::{AppOrderTask, VoucherModel};
use crate::repository::{AbsSeckillStockRepo, AbsVoucherRepo, AppReserveOutcome};
use crate::AppSharedState;

/// ordinary outcomes surfaced to the requesting user, none of them is an
/// infrastructure fault
#[derive(Debug, Clone, PartialEq)]
pub enum SeckillRejectReason {
    NotStarted,
    Ended,
    InsufficientStock,
    DuplicateOrder,
    SystemBusy,
}

pub enum SeckillUcError {
    Reject(SeckillRejectReason),
    Server(AppError),
}

pub type AppOrderTaskReceiver = mpsc::Receiver<AppOrderTask>;

/// producer side of the admission-to-persistence hand-off. The channel is
/// the only crossing point, request tasks push and exactly one worker
/// drains. Capacity is configured high enough that hitting it means the
/// worker already fell far behind.
#[derive(Clone)]
pub struct AppOrderTaskSender {
    inner: mpsc::Sender<AppOrderTask>,
    policy: AppQueueOverflowPolicy,
}

pub struct AppOrderTaskQueue;

impl AppOrderTaskQueue {
    pub fn build(cfg: &AppSeckillCfg) -> (AppOrderTaskSender, AppOrderTaskReceiver) {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        let sender = AppOrderTaskSender {
            inner: tx,
            policy: cfg.queue_overflow,
        };
        (sender, rx)
    }
}

impl AppOrderTaskSender {
    pub async fn send(&self, task: AppOrderTask) -> DefaultResult<(), AppError> {
        match self.policy {
            AppQueueOverflowPolicy::Block => {
                self.inner.send(task).await.map_err(|e| AppError {
                    code: AppErrorCode::TaskQueueClosed,
                    detail: Some(format!("order-id:{}", e.0.order_id)),
                })
            }
            AppQueueOverflowPolicy::Reject => match self.inner.try_send(task) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(t)) => Err(AppError {
                    code: AppErrorCode::TaskQueueOverflow,
                    detail: Some(format!("order-id:{}", t.order_id)),
                }),
                Err(mpsc::error::TrySendError::Closed(t)) => Err(AppError {
                    code: AppErrorCode::TaskQueueClosed,
                    detail: Some(format!("order-id:{}", t.order_id)),
                }),
            },
        }
    }
} // end of impl AppOrderTaskSender

/// publish path run by shop staff ahead of a sale, the flash-sale stock
/// counter in the shared store is seeded together with the durable row,
/// the admission path relies on that pre-warming
pub struct PublishVoucherUseCase {
    pub repo_voucher: Box<dyn AbsVoucherRepo>,
    pub repo_flash: Box<dyn AbsSeckillStockRepo>,
}

impl PublishVoucherUseCase {
    pub async fn execute(self, item: VoucherModel) -> DefaultResult<(), AppError> {
        let (voucher_id, stock) = (item.voucher_id, item.stock);
        self.repo_voucher.save(item).await?;
        self.repo_flash.preload_stock(voucher_id, stock).await
    }
}

pub struct SeckillVoucherUseCase {
    pub glb_state: AppSharedState,
    pub repo_voucher: Box<dyn AbsVoucherRepo>,
    pub repo_flash: Box<dyn AbsSeckillStockRepo>,
    pub task_sender: AppOrderTaskSender,
}

impl SeckillVoucherUseCase {
    /// admission path of a purchase request, returns the generated order
    /// ID as soon as the reservation is accepted, durable persistence
    /// happens later in `OrderPersistWorker`
    pub async fn execute(self, voucher_id: u64, usr_id: u32) -> DefaultResult<u64, SeckillUcError> {
        let voucher = match self.repo_voucher.fetch(voucher_id).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                let e = AppError {
                    code: AppErrorCode::VoucherNotExist,
                    detail: Some(voucher_id.to_string()),
                };
                return Err(SeckillUcError::Server(e));
            }
            Err(e) => {
                return Err(SeckillUcError::Server(e));
            }
        };
        // the sale window is evaluated against wall clock at call time,
        // a cached verdict would extend or shrink the window
        let timenow = LocalTime::now().fixed_offset();
        if voucher.not_started(&timenow) {
            return Err(SeckillUcError::Reject(SeckillRejectReason::NotStarted));
        }
        if voucher.ended(&timenow) {
            return Err(SeckillUcError::Reject(SeckillRejectReason::Ended));
        }
        let outcome = self
            .repo_flash
            .try_reserve(voucher_id, usr_id)
            .await
            .map_err(SeckillUcError::Server)?;
        match outcome {
            AppReserveOutcome::OutOfStock => {
                Err(SeckillUcError::Reject(SeckillRejectReason::InsufficientStock))
            }
            AppReserveOutcome::AlreadyTaken => {
                Err(SeckillUcError::Reject(SeckillRejectReason::DuplicateOrder))
            }
            AppReserveOutcome::Reserved => self.enqueue_reserved(voucher_id, usr_id).await,
        }
    } // end of fn execute

    async fn enqueue_reserved(
        &self,
        voucher_id: u64,
        usr_id: u32,
    ) -> DefaultResult<u64, SeckillUcError> {
        let id_gen = self.glb_state.id_generator();
        let order_id = id_gen
            .next_id(app_meta::BIZ_PREFIX_ORDER)
            .await
            .map_err(SeckillUcError::Server)?;
        let task = AppOrderTask {
            order_id,
            usr_id,
            voucher_id,
        };
        if let Err(e) = self.task_sender.send(task).await {
            let logctx_p = self.glb_state.log_context().clone();
            app_log_event!(
                logctx_p,
                AppLogLevel::ERROR,
                "reservation dropped, order-id:{}, usr:{}, voucher:{}, {}",
                order_id,
                usr_id,
                voucher_id,
                e
            );
            let reason = if matches!(e.code, AppErrorCode::TaskQueueOverflow) {
                SeckillUcError::Reject(SeckillRejectReason::SystemBusy)
            } else {
                SeckillUcError::Server(e)
            };
            return Err(reason);
        }
        Ok(order_id)
    } // end of fn enqueue_reserved
} // end of impl SeckillVoucherUseCase
