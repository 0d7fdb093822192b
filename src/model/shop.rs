use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopModel {
    pub id: u64,
    pub name: String,
    pub address: String,
    // score rated by end users, scaled by 10 so it stays an integer
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopCategoryModel {
    pub id: u64,
    pub name: String,
    pub sort_seq: u16,
}
