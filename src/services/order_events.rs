//! 订单变更广播
//!
//! 每次订单写入提交后发布一条事件，厨房 / 吧台 / 后台屏通过事件流实时刷新。
//! 同一订单的事件按提交顺序发布；订阅方断开后不再消费，已提交的写入不受影响。

use crate::models::OrderResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    #[serde(rename = "order_created")]
    Created,
    StatusChanged,
    PaymentConfirmed,
    PaymentRejected,
    ProofAttached,
    #[serde(rename = "order_deleted")]
    Deleted,
}

impl OrderEventKind {
    /// SSE `event:` 字段
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventKind::Created => "order_created",
            OrderEventKind::StatusChanged => "status_changed",
            OrderEventKind::PaymentConfirmed => "payment_confirmed",
            OrderEventKind::PaymentRejected => "payment_rejected",
            OrderEventKind::ProofAttached => "proof_attached",
            OrderEventKind::Deleted => "order_deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_code: String,
    /// 删除事件或对订阅者不可见时为空，前端据此移除卡片
    pub order: Option<OrderResponse>,
    pub at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(kind: OrderEventKind, order: OrderResponse) -> Self {
        Self {
            kind,
            order_code: order.order_code.clone(),
            order: Some(order),
            at: Utc::now(),
        }
    }

    pub fn deleted(order_code: String) -> Self {
        Self {
            kind: OrderEventKind::Deleted,
            order_code,
            order: None,
            at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct OrderEventHub {
    tx: broadcast::Sender<OrderEvent>,
}

impl Default for OrderEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderEventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: OrderEvent) {
        let kind = event.kind;
        let code = event.order_code.clone();
        match self.tx.send(event) {
            Ok(n) => log::debug!("Order event {kind:?} for {code} delivered to {n} subscribers"),
            // 没有订阅者时丢弃
            Err(_) => log::debug!("Order event {kind:?} for {code} dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_publish_order() {
        let hub = OrderEventHub::new();
        let mut rx = hub.subscribe();
        hub.publish(OrderEvent::deleted("ORD-1".into()));
        hub.publish(OrderEvent::deleted("ORD-2".into()));

        assert_eq!(rx.recv().await.unwrap().order_code, "ORD-1");
        assert_eq!(rx.recv().await.unwrap().order_code, "ORD-2");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let hub = OrderEventHub::new();
        assert_eq!(hub.subscriber_count(), 0);
        hub.publish(OrderEvent::deleted("ORD-1".into()));
    }
}
