use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub label: String,
    /// 当前占用该桌台的订单（NULL = 空闲）
    pub active_order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_claimed(&self) -> bool {
        self.active_order_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
