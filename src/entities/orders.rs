use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 出品状态
///
/// 正向链路 `pending -> cooking -> ready -> completed`，只能逐级推进；
/// `payment_rejected` 为终态，只能从待支付的 `pending` 进入。
/// `queue` 为旧数据中的排队状态，视同制作中。
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "queue")]
    Queue,
    #[sea_orm(string_value = "cooking")]
    Cooking,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "payment_rejected")]
    PaymentRejected,
}

impl OrderStatus {
    /// 占用桌台的状态集合
    pub const ACTIVE: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Queue,
        OrderStatus::Cooking,
        OrderStatus::Ready,
    ];

    /// "下一步" 按钮对应的唯一合法目标状态
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Cooking),
            OrderStatus::Cooking => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Completed),
            // queue 只用于兼容旧数据，不提供推进
            OrderStatus::Queue | OrderStatus::Completed | OrderStatus::PaymentRejected => None,
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::PaymentRejected)
    }

    /// 链路上的位置，终态拒绝不在链路上
    pub fn stage(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Queue | OrderStatus::Cooking => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Completed => Some(3),
            OrderStatus::PaymentRejected => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Queue => "queue",
            OrderStatus::Cooking => "cooking",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::PaymentRejected => "payment_rejected",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 支付状态（独立于出品状态）
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "qris")]
    Qris,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "gateway")]
    Gateway,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Qris => write!(f, "qris"),
            PaymentMethod::BankTransfer => write!(f, "bank_transfer"),
            PaymentMethod::Gateway => write!(f, "gateway"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 对外展示的订单号，与主键无关
    pub order_code: String,
    pub table_label: String,
    pub customer_name: String,
    pub user_id: Option<i64>,
    pub sub_total: i64,
    /// 转账识别码，加在小计上用于区分同额转账
    pub unique_code: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub payment_proof_url: Option<String>,
    pub note: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_next_follows_forward_chain() {
        assert_eq!(OrderStatus::Pending.next(), Some(OrderStatus::Cooking));
        assert_eq!(OrderStatus::Cooking.next(), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::Ready.next(), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::Completed.next(), None);
        assert_eq!(OrderStatus::PaymentRejected.next(), None);
        assert_eq!(OrderStatus::Queue.next(), None);
    }

    #[test]
    fn test_next_never_skips_or_goes_backward() {
        for status in OrderStatus::iter() {
            if let Some(next) = status.next() {
                let from = status.stage().unwrap();
                let to = next.stage().unwrap();
                assert_eq!(to, from + 1, "{status} -> {next}");
            }
        }
    }

    #[test]
    fn test_active_set() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::Ready.is_active());
        assert!(!OrderStatus::Completed.is_active());
        assert!(!OrderStatus::PaymentRejected.is_active());
        for status in OrderStatus::iter() {
            assert_ne!(status.is_active(), status.is_terminal());
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PaymentRejected).unwrap(),
            "\"payment_rejected\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
    }
}
