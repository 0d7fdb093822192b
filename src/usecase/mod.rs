mod persist_order;
mod query_shop;
mod seckill;

pub use persist_order::OrderPersistWorker;
pub use query_shop::ShopQueryUseCase;
pub use seckill::{
    AppOrderTaskQueue, AppOrderTaskReceiver, AppOrderTaskSender, PublishVoucherUseCase,
    SeckillRejectReason, SeckillUcError, SeckillVoucherUseCase,
};
