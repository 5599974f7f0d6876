use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SalesReportQuery {
    /// YYYY-MM-DD
    pub start_date: Option<String>,
    /// YYYY-MM-DD
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalesReportResponse {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_orders: i64,
    pub paid_orders: i64,
    /// 已支付且未被拒绝订单的 total 之和（含识别码）
    pub revenue: i64,
    pub by_status: Vec<StatusCount>,
    pub products: Vec<ProductSales>,
}
