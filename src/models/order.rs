use crate::entities::{
    OrderStatus, PaymentMethod, PaymentStatus, order_entity, order_item_entity,
};
use crate::utils::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_NOTE_LEN: usize = 500;
pub const MAX_ITEM_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    #[schema(example = 1)]
    pub product_id: i64,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "tidak pedas")]
    pub note: Option<String>,
}

/// 顾客下单
///
/// `table_label` 由扫码得到的桌台上下文显式传入
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[schema(example = "5")]
    pub table_label: String,
    #[schema(example = "Budi")]
    pub customer_name: String,
    pub items: Vec<CreateOrderItemRequest>,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    /// 设备当前位置，用于地理围栏
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachPaymentProofRequest {
    #[schema(example = "https://cdn.example.com/proofs/abc.jpg")]
    pub payment_proof_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub note: Option<String>,
    pub category: String,
}

impl From<order_item_entity::Model> for OrderItemResponse {
    fn from(m: order_item_entity::Model) -> Self {
        Self {
            product_id: m.product_id,
            product_name: m.product_name,
            unit_price: m.unit_price,
            quantity: m.quantity,
            note: m.note,
            category: m.category,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub order_code: String,
    pub table_label: String,
    pub customer_name: String,
    pub items: Vec<OrderItemResponse>,
    pub sub_total: i64,
    pub unique_code: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub payment_proof_url: Option<String>,
    pub note: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// 当前状态下唯一可执行的推进目标
    pub next_status: Option<OrderStatus>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_parts(m: order_entity::Model, items: Vec<order_item_entity::Model>) -> Self {
        Self {
            id: m.id,
            order_code: m.order_code,
            table_label: m.table_label,
            customer_name: m.customer_name,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            sub_total: m.sub_total,
            unique_code: m.unique_code,
            total: m.total,
            payment_method: m.payment_method,
            payment_proof_url: m.payment_proof_url,
            note: m.note,
            next_status: m.status.next(),
            status: m.status,
            payment_status: m.payment_status,
            paid_at: m.paid_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub table_label: Option<String>,
    /// YYYY-MM-DD
    pub start_date: Option<String>,
    /// YYYY-MM-DD
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StationQuery {
    /// 仅后台账号可指定，厨房 / 吧台账号固定为自己的工位
    pub station: Option<Station>,
}

/// 出品工位
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    Kitchen,
    Bar,
}

/// 分类名包含这些关键字的商品走吧台，其余走厨房
const BAR_KEYWORDS: &[&str] = &[
    "minuman", "drink", "beverage", "coffee", "kopi", "tea", "teh", "juice", "jus", "bar",
];

impl Station {
    pub fn for_category(category: &str) -> Station {
        let category = category.to_lowercase();
        if BAR_KEYWORDS.iter().any(|k| category.contains(k)) {
            Station::Bar
        } else {
            Station::Kitchen
        }
    }

    /// 工位屏可见的出品状态；吧台不显示 pending
    pub fn visible_statuses(&self) -> &'static [OrderStatus] {
        match self {
            Station::Kitchen => &[
                OrderStatus::Pending,
                OrderStatus::Queue,
                OrderStatus::Cooking,
                OrderStatus::Ready,
            ],
            Station::Bar => &[OrderStatus::Queue, OrderStatus::Cooking, OrderStatus::Ready],
        }
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Station::Kitchen => write!(f, "kitchen"),
            Station::Bar => write!(f, "bar"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_routing_by_category_keyword() {
        assert_eq!(Station::for_category("Makanan Berat"), Station::Kitchen);
        assert_eq!(Station::for_category("Minuman Dingin"), Station::Bar);
        assert_eq!(Station::for_category("Kopi"), Station::Bar);
        assert_eq!(Station::for_category("Snack"), Station::Kitchen);
    }

    #[test]
    fn test_bar_hides_pending() {
        assert!(Station::Kitchen.visible_statuses().contains(&OrderStatus::Pending));
        assert!(!Station::Bar.visible_statuses().contains(&OrderStatus::Pending));
        for station in [Station::Kitchen, Station::Bar] {
            assert!(!station.visible_statuses().contains(&OrderStatus::Completed));
            assert!(
                !station
                    .visible_statuses()
                    .contains(&OrderStatus::PaymentRejected)
            );
        }
    }
}
