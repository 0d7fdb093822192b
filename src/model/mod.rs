mod order;
mod shop;
mod voucher;

pub use order::{AppOrderTask, VoucherOrderModel};
pub use shop::{ShopCategoryModel, ShopModel};
pub use voucher::VoucherModel;
