use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 门店定位配置（单行），下单时只读，用于地理围栏
/// polygon: JSON 数组 `[{"latitude":..,"longitude":..}, ...]`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "store_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub polygon: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
